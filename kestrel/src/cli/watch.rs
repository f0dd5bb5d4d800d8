//! The `watch` command: a resource table kept in sync with the cluster.
//!
//! Every tick lists the resource, reconciles the result into a canonical
//! [`TableData`] and derives the printed view from it (filter, sort and
//! optional label projection). The view is only printed when it differs from
//! the last one printed, ignoring the ticking `AGE` column.

use std::{io::Write, time::Duration};

use clap::{Args, ValueEnum};
use k8s_openapi::api::core::v1::{Node, Pod};
use kestrel_base::namespace;
use kestrel_model::{
    DeltaPolicy, FilterOpts, FilterQuery, RawObject, Renderer, SortColumn, TableData, ViewSetting,
};
use kube::{Api, api::ListParams};
use snafu::ResultExt;

use crate::{
    cli::error::{self, Error},
    config::Config,
    render::{NodeRenderer, PodRenderer},
    ui::table::TableDataExt,
};

/// Resource kinds the `watch` command knows how to render.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ResourceKind {
    #[value(alias = "po")]
    Pods,

    #[value(alias = "no")]
    Nodes,
}

impl ResourceKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pods => "pods",
            Self::Nodes => "nodes",
        }
    }

    const fn is_namespaced(self) -> bool { matches!(self, Self::Pods) }
}

/// Options of `kestrel watch`.
///
/// Flags given here win over the view setting persisted for the resource in
/// the configuration file.
#[derive(Args, Clone)]
pub struct WatchCommand {
    #[arg(value_enum, help = "Resource to watch")]
    pub resource: ResourceKind,

    #[arg(
        short,
        long,
        help = "Kubernetes namespace to watch. Defaults to the current Kubernetes context's \
                namespace."
    )]
    pub namespace: Option<String>,

    #[arg(short = 'A', long, help = "Watch the resource across all Kubernetes namespaces.")]
    pub all_namespaces: bool,

    #[arg(
        short,
        long,
        help = "Filter rows: a regex (prefix with ! to invert), -f <fuzzy query> or a label \
                selector such as app=nginx."
    )]
    pub filter: Option<String>,

    #[arg(long, help = "Keep the rows that do not match the regex filter.")]
    pub invert: bool,

    #[arg(long, help = "Only show rows carrying a validation warning.")]
    pub toast: bool,

    #[arg(short, long, help = "Sort by this column, overriding the persisted view setting.")]
    pub sort: Option<String>,

    #[arg(long, help = "Sort in descending order.")]
    pub desc: bool,

    #[arg(
        short,
        long,
        num_args = 0..,
        value_delimiter = ',',
        help = "Project labels into columns. Without keys every label found is shown."
    )]
    pub labels: Option<Vec<String>>,

    #[arg(short, long, help = "Show wide columns.")]
    pub wide: bool,

    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between two refreshes, at least 1. Defaults to the configured interval."
    )]
    pub interval: Option<u64>,

    #[arg(long, help = "Print the table once and exit.")]
    pub once: bool,
}

impl WatchCommand {
    /// Watches the resource until Ctrl-C, or for a single refresh with
    /// `--once`.
    ///
    /// A refresh that fails to list or render the resource is logged and
    /// skipped; the last printed table stays on screen and the next tick
    /// tries again.
    ///
    /// # Errors
    ///
    /// Fails when the Ctrl-C handler cannot be installed, when stdout cannot
    /// be written, or, with `--once`, when the single refresh fails.
    pub async fn run(self, kube_client: kube::Client, config: Config) -> Result<(), Error> {
        let Self {
            resource,
            namespace,
            all_namespaces,
            filter,
            invert,
            toast,
            sort,
            desc,
            labels,
            wide,
            interval,
            once,
        } = self;

        let namespace = if all_namespaces || !resource.is_namespaced() {
            namespace::BLANK_NAMESPACE.to_string()
        } else {
            namespace
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| kube_client.default_namespace().to_string())
        };

        let view_setting = config.view_setting(resource.as_str()).cloned();
        let columns = match (&labels, &view_setting) {
            (None, Some(setting)) => setting.columns.clone(),
            _ => Vec::new(),
        };
        let opts = FilterOpts { toast, filter: filter.unwrap_or_default(), invert };
        let list_params = match opts.query() {
            FilterQuery::LabelSelector(selector) => ListParams::default().labels(&selector),
            _ => ListParams::default(),
        };
        let manual = sort.map(|name| SortColumn::new(name, !desc)).unwrap_or_default();

        let mut pipeline = ViewPipeline::new(resource, &namespace, opts, manual, view_setting, labels);

        let mut ticker =
            tokio::time::interval(interval.map_or(config.refresh_interval, Duration::from_secs));
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                res = &mut ctrl_c => {
                    res.context(error::CreateSignalStreamSnafu)?;
                    tracing::info!("Received Ctrl-C, stop watching {}", resource.as_str());
                    return Ok(());
                }
            }

            let synced = match resource {
                ResourceKind::Pods => {
                    let pods = list_pods(kube_client.clone(), &namespace, &list_params).await;
                    pipeline.sync(&PodRenderer::new(), pods)
                }
                ResourceKind::Nodes => {
                    let nodes = list_nodes(kube_client.clone(), &list_params).await;
                    pipeline.sync(&NodeRenderer::new(), nodes)
                }
            };

            match synced {
                Ok(Some(view)) => {
                    let mut stdout = std::io::stdout().lock();
                    writeln!(stdout, "{}\n", view.render_table(&columns, wide))
                        .context(error::WriteStdoutSnafu)?;
                }
                Ok(None) => {}
                Err(err) if once => return Err(err),
                Err(err) => tracing::warn!("{err}, keeping the last table"),
            }

            if once {
                return Ok(());
            }
        }
    }
}

/// The per-refresh pipeline from fetched objects to the printed view.
///
/// The canonical table is reconciled in place. The printed view is derived
/// from it on every refresh and remembered, so an unchanged cluster prints
/// nothing.
struct ViewPipeline {
    resource: ResourceKind,

    table: TableData,

    /// The last view printed.
    printed: Option<TableData>,

    opts: FilterOpts,

    manual: SortColumn,

    view_setting: Option<ViewSetting>,

    labels: Option<Vec<String>>,
}

impl ViewPipeline {
    fn new(
        resource: ResourceKind,
        namespace: &str,
        opts: FilterOpts,
        manual: SortColumn,
        view_setting: Option<ViewSetting>,
        labels: Option<Vec<String>>,
    ) -> Self {
        let table = TableData::new(resource.as_str()).with_delta_policy(DeltaPolicy::IgnoreVolatile);
        table.reset(namespace);
        Self { resource, table, printed: None, opts, manual, view_setting, labels }
    }

    /// Reconciles one fetch and returns the view to print, or `None` when it
    /// does not differ from the last view printed.
    ///
    /// # Errors
    ///
    /// Fails when the fetch failed or the objects cannot be rendered. The
    /// table and the last printed view are left as they were.
    fn sync<R: Renderer>(
        &mut self,
        renderer: &R,
        fetched: Result<Vec<RawObject<R::Object>>, Error>,
    ) -> Result<Option<&TableData>, Error> {
        let resource = self.resource.as_str();
        let report = self
            .table
            .render(renderer, &fetched?)
            .context(error::RenderTableSnafu { resource })?;
        tracing::debug!(
            "Reconciled {resource}: {} added, {} updated, {} removed",
            report.added.len(),
            report.updated.len(),
            report.removed.len()
        );

        let sort_col =
            self.table.compute_sort_col(self.view_setting.as_ref(), &self.manual, self.manual.is_set());
        let view = self.table.filter(&self.opts);
        view.sort(&sort_col);
        let view = match &self.labels {
            Some(keys) => view.labelize(keys),
            None => view,
        };

        if self.printed.as_ref().is_some_and(|printed| !printed.diff(&view)) {
            return Ok(None);
        }
        Ok(Some(self.printed.insert(view)))
    }
}

async fn list_pods(
    kube_client: kube::Client,
    namespace: &str,
    list_params: &ListParams,
) -> Result<Vec<RawObject<Pod>>, Error> {
    let resource = ResourceKind::Pods.as_str();
    let pods = if namespace::is_all_namespaces(namespace) {
        Api::<Pod>::all(kube_client)
            .list(list_params)
            .await
            .context(error::ListResourcesSnafu { resource })?
    } else {
        Api::<Pod>::namespaced(kube_client, namespace)
            .list(list_params)
            .await
            .context(error::ListResourcesWithNamespaceSnafu { resource, namespace })?
    };
    Ok(into_raw(pods.items))
}

async fn list_nodes(
    kube_client: kube::Client,
    list_params: &ListParams,
) -> Result<Vec<RawObject<Node>>, Error> {
    let nodes = Api::<Node>::all(kube_client)
        .list(list_params)
        .await
        .context(error::ListResourcesSnafu { resource: ResourceKind::Nodes.as_str() })?;
    Ok(into_raw(nodes.items))
}

fn into_raw<T>(items: Vec<T>) -> Vec<RawObject<T>> { items.into_iter().map(RawObject::Object).collect() }
