use snafu::{ResultExt, Snafu};
use stackable_zookeeper_operator::{controller, crd::APP_NAME, logging};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitLogging { source: logging::Error },

    #[snafu(display("failed to create Kubernetes client"))]
    CreateClient { source: kube::Error },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::initialize_logging("ZOOKEEPER_OPERATOR_LOG", APP_NAME).context(InitLoggingSnafu)?;

    let client = kube::Client::try_default()
        .await
        .context(CreateClientSnafu)?;
    controller::run(client).await;
    Ok(())
}
