use k8s_openapi::{api::core::v1::Node, jiff::Timestamp};
use kestrel_base::consts::{NOT_AVAILABLE, columns};
use kestrel_model::{Header, HeaderColumn, RenderError, Renderer, Row};

const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";
const CONDITION_READY: &str = "Ready";

/// Renders nodes the way `kubectl get nodes` shows them, plus the
/// allocatable `CPU` and `MEMORY`.
///
/// Nodes are cluster-scoped, so the namespace is ignored and the row ID is
/// the node name. `VALID` is empty for a `Ready` node and describes the
/// node's status otherwise.
#[derive(Clone, Copy, Debug)]
pub struct NodeRenderer {
    now: Timestamp,
}

impl NodeRenderer {
    pub fn new() -> Self { Self::at(Timestamp::now()) }

    /// A renderer computing ages relative to `now`.
    pub const fn at(now: Timestamp) -> Self { Self { now } }
}

impl Renderer for NodeRenderer {
    type Object = Node;

    fn header(&self, _namespace: &str) -> Header {
        Header::new(vec![
            HeaderColumn::new(columns::NAME),
            HeaderColumn::new("STATUS"),
            HeaderColumn::new("ROLES"),
            HeaderColumn::new("VERSION"),
            HeaderColumn::new("INTERNAL-IP").wide(),
            HeaderColumn::new("OS-IMAGE").wide(),
            HeaderColumn::metric("CPU"),
            HeaderColumn::capacity("MEMORY"),
            HeaderColumn::new(columns::VALID).wide(),
            HeaderColumn::new(columns::LABELS).wide(),
            HeaderColumn::time(columns::AGE),
        ])
    }

    /// # Errors
    ///
    /// Fails when the node has no name.
    fn render(&self, node: &Node, _namespace: &str) -> Result<Row, RenderError> {
        let meta = &node.metadata;
        let name = meta.name.as_deref().ok_or_else(|| RenderError::missing_field("metadata.name"))?;
        let status = node.status.as_ref();

        let ready = status
            .and_then(|s| s.conditions.as_ref())
            .into_iter()
            .flatten()
            .find(|condition| condition.type_ == CONDITION_READY)
            .map(|condition| condition.status.as_str());
        let unschedulable = node.spec.as_ref().and_then(|s| s.unschedulable).unwrap_or(false);
        let mut node_status = match ready {
            Some("True") => "Ready".to_string(),
            Some(_) => "NotReady".to_string(),
            None => "Unknown".to_string(),
        };
        if unschedulable {
            node_status.push_str(",SchedulingDisabled");
        }
        let valid = if ready == Some("True") { String::new() } else { format!("node is {node_status}") };

        let roles = meta
            .labels
            .iter()
            .flatten()
            .filter_map(|(key, _)| key.strip_prefix(ROLE_LABEL_PREFIX))
            .collect::<Vec<_>>();
        let roles = if roles.is_empty() { "<none>".to_string() } else { roles.join(",") };

        let node_info = status.and_then(|s| s.node_info.as_ref());
        let internal_ip = status
            .and_then(|s| s.addresses.as_ref())
            .into_iter()
            .flatten()
            .find(|address| address.type_ == "InternalIP")
            .map(|address| address.address.clone())
            .unwrap_or_default();
        let allocatable = |resource: &str| {
            status
                .and_then(|s| s.allocatable.as_ref())
                .and_then(|allocatable| allocatable.get(resource))
                .map_or_else(|| NOT_AVAILABLE.to_string(), |quantity| quantity.0.clone())
        };

        Ok(Row::new(name, [
            name.to_string(),
            node_status,
            roles,
            node_info.map(|info| info.kubelet_version.clone()).unwrap_or_default(),
            internal_ip,
            node_info.map(|info| info.os_image.clone()).unwrap_or_default(),
            allocatable("cpu"),
            allocatable("memory"),
            valid,
            super::labels_cell(meta.labels.as_ref()),
            super::age(meta, self.now),
        ]))
    }
}
