use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;

use super::{ResourceBuilder, Result, SharedContext};
use crate::crd::{LOGBACK_XML, LoggingSpec};

/// Renders the logback configuration of the server container.
pub fn logback_xml(logging: &LoggingSpec) -> String {
    let root_level = logging.root_level.unwrap_or_default().to_logback_literal();
    let console_level = logging
        .console_level
        .unwrap_or_default()
        .to_logback_literal();
    let loggers: String = logging
        .loggers
        .iter()
        .map(|(name, level)| {
            format!(
                "  <logger name=\"{name}\" level=\"{}\"/>\n",
                level.to_logback_literal()
            )
        })
        .collect();

    format!(
        r#"<configuration>
  <appender name="CONSOLE" class="ch.qos.logback.core.ConsoleAppender">
    <encoder>
      <pattern>%d{{ISO8601}} [myid:%X{{myid}}] - %-5p [%t:%C{{1}}@%L] - %m%n</pattern>
    </encoder>
    <filter class="ch.qos.logback.classic.filter.ThresholdFilter">
      <level>{console_level}</level>
    </filter>
  </appender>

{loggers}  <root level="{root_level}">
    <appender-ref ref="CONSOLE"/>
  </root>
</configuration>
"#
    )
}

/// The name of the ConfigMap holding the logging configuration of a role group.
pub fn log_config_map_name(object_name: &str) -> String {
    format!("{object_name}-log")
}

/// The `{role group}-log` ConfigMap holding `logback.xml`.
pub struct LogConfigMapBuilder<'a> {
    context: SharedContext<'a>,
}

impl<'a> LogConfigMapBuilder<'a> {
    pub fn new(context: SharedContext<'a>) -> Self {
        Self { context }
    }
}

impl ResourceBuilder for LogConfigMapBuilder<'_> {
    type Resource = ConfigMap;

    fn name(&self) -> String {
        log_config_map_name(&self.context.object_name())
    }

    fn build(&self) -> Result<Option<ConfigMap>> {
        let logging = self
            .context
            .spec
            .config
            .as_ref()
            .and_then(|config| config.logging.clone())
            .unwrap_or_default();

        Ok(Some(ConfigMap {
            metadata: self.context.object_meta(self.name())?,
            data: Some(BTreeMap::from([(
                LOGBACK_XML.to_owned(),
                logback_xml(&logging),
            )])),
            ..Default::default()
        }))
    }
}
