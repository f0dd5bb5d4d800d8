use k8s_openapi::{
    api::core::v1::{ContainerStatus, Pod},
    jiff::Timestamp,
};
use kestrel_base::{consts::columns, namespace};
use kestrel_model::{Header, HeaderColumn, RenderError, Renderer, Row};

const PHASE_RUNNING: &str = "Running";
const PHASE_SUCCEEDED: &str = "Succeeded";
const STATUS_TERMINATING: &str = "Terminating";
const STATUS_UNKNOWN: &str = "Unknown";

/// Renders pods the way `kubectl get pods` shows them.
///
/// The columns are `NAME`, `READY`, `STATUS`, `RESTARTS` and `AGE`, preceded
/// by `NAMESPACE` when the view spans every namespace. Wide mode adds `IP`,
/// `NODE`, `VALID` and `LABELS`.
///
/// `VALID` is empty for a healthy pod: one that succeeded, or is running
/// with every container ready. Otherwise it names the first waiting reason
/// or the number of ready containers, so the toast filter can single the
/// pod out.
#[derive(Clone, Copy, Debug)]
pub struct PodRenderer {
    /// Reference point of the `AGE` column.
    now: Timestamp,
}

impl PodRenderer {
    /// A renderer computing ages relative to the current time.
    pub fn new() -> Self { Self::at(Timestamp::now()) }

    /// A renderer computing ages relative to `now`.
    pub const fn at(now: Timestamp) -> Self { Self { now } }
}

impl Renderer for PodRenderer {
    type Object = Pod;

    fn header(&self, namespace: &str) -> Header {
        let ns_col =
            namespace::is_all_namespaces(namespace).then(|| HeaderColumn::new(columns::NAMESPACE));
        ns_col
            .into_iter()
            .chain([
                HeaderColumn::new(columns::NAME),
                HeaderColumn::new("READY"),
                HeaderColumn::new("STATUS"),
                HeaderColumn::metric("RESTARTS"),
                HeaderColumn::new("IP").wide(),
                HeaderColumn::new("NODE").wide(),
                HeaderColumn::new(columns::VALID).wide(),
                HeaderColumn::new(columns::LABELS).wide(),
                HeaderColumn::time(columns::AGE),
            ])
            .collect()
    }

    /// Renders one pod. The row ID is `namespace/name`.
    ///
    /// # Errors
    ///
    /// Fails when the pod has no name.
    fn render(&self, pod: &Pod, namespace: &str) -> Result<Row, RenderError> {
        let meta = &pod.metadata;
        let name = meta.name.as_deref().ok_or_else(|| RenderError::missing_field("metadata.name"))?;
        let pod_ns = meta.namespace.as_deref().unwrap_or_default();

        let spec = pod.spec.as_ref();
        let status = pod.status.as_ref();
        let statuses = status.and_then(|s| s.container_statuses.as_deref()).unwrap_or_default();
        let total = spec.map_or(statuses.len(), |s| s.containers.len());
        let ready = statuses.iter().filter(|s| s.ready).count();
        let restarts = statuses.iter().map(|s| i64::from(s.restart_count)).sum::<i64>();
        let phase = status.and_then(|s| s.phase.as_deref()).unwrap_or(STATUS_UNKNOWN);
        let waiting = statuses.iter().find_map(waiting_reason);

        let pod_status = if meta.deletion_timestamp.is_some() {
            STATUS_TERMINATING
        } else {
            waiting.unwrap_or(phase)
        };
        let valid = if phase == PHASE_SUCCEEDED || (phase == PHASE_RUNNING && ready == total) {
            String::new()
        } else if let Some(reason) = waiting {
            format!("container {reason}")
        } else {
            format!("containers not ready ({ready}/{total})")
        };

        let fields = ns_field(pod_ns, namespace).into_iter().chain([
            name.to_string(),
            format!("{ready}/{total}"),
            pod_status.to_string(),
            restarts.to_string(),
            status.and_then(|s| s.pod_ip.clone()).unwrap_or_default(),
            spec.and_then(|s| s.node_name.clone()).unwrap_or_default(),
            valid,
            super::labels_cell(meta.labels.as_ref()),
            super::age(meta, self.now),
        ]);
        Ok(Row::new(namespace::fqn(pod_ns, name), fields))
    }
}

/// The namespace cell, only present when the view spans every namespace.
fn ns_field(object_namespace: &str, view_namespace: &str) -> Option<String> {
    namespace::is_all_namespaces(view_namespace).then(|| object_namespace.to_string())
}

fn waiting_reason(status: &ContainerStatus) -> Option<&str> {
    status.state.as_ref()?.waiting.as_ref()?.reason.as_deref()
}
