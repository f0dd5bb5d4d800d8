use snafu::Snafu;

/// Errors surfaced by the `kestrel` commands.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"))]
    Configuration { source: crate::config::Error },

    #[snafu(display("Failed to write to stdout, error: {source}"))]
    WriteStdout { source: std::io::Error },

    #[snafu(display("Failed to initialize Kubernetes client configuration, error: {source}"))]
    KubeConfig {
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Failed to list {resource}, error: {source}"))]
    ListResources {
        resource: &'static str,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Failed to list {resource} in namespace {namespace}, error: {source}"))]
    ListResourcesWithNamespace {
        resource: &'static str,
        namespace: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Failed to render {resource}, error: {source}"))]
    RenderTable { resource: &'static str, source: kestrel_model::Error },

    #[snafu(display("Failed to listen for Ctrl-C, error: {source}"))]
    CreateSignalStream { source: std::io::Error },

    #[snafu(display("Failed to create tokio runtime, error: {source}"))]
    InitializeTokioRuntime { source: std::io::Error },
}

impl From<crate::config::Error> for Error {
    fn from(source: crate::config::Error) -> Self { Self::Configuration { source } }
}
