//! Backend registry.
//!
//! Backends are declared once in [`DESCRIPTORS`]. At startup each descriptor
//! whose upstreams are all configured becomes one or more [`Mount`]s; the
//! rest are simply absent from the route table.

mod config;
mod route;

#[cfg(test)]
pub(crate) use route::tests::RecordingForwarder;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderValue;
use log::info;

pub use config::{BackendConfig, BackendsConfig, UpstreamKind};
pub use route::{BackendRoute, CredentialPolicy};

use crate::paths::single_joining_slash;
use crate::proxy::{Forward, HttpForwarder, ProxyError, Upstream};
use crate::router::Guard;

/// One mount point of a backend, relative to the base path.
#[derive(Debug, Clone, Copy)]
pub struct MountSpec {
    pub pattern: &'static str,
    pub strip: &'static str,
    pub upstream: UpstreamKind,
}

impl MountSpec {
    const fn subtree(pattern: &'static str, upstream: UpstreamKind) -> Self {
        Self {
            pattern,
            strip: pattern,
            upstream,
        }
    }
}

/// A backend group and the upstreams it needs.
#[derive(Debug, Clone, Copy)]
pub struct BackendDescriptor {
    pub name: &'static str,
    pub mounts: &'static [MountSpec],
    pub credential: CredentialPolicy,
    pub guard: Guard,
    /// Overwrite `Origin` with the console's own origin.
    pub console_origin: bool,
}

impl BackendDescriptor {
    const fn injected(name: &'static str, mounts: &'static [MountSpec]) -> Self {
        Self {
            name,
            mounts,
            credential: CredentialPolicy::Inject,
            guard: Guard::Identity,
            console_origin: false,
        }
    }

    /// Enabled iff every upstream it names is configured.
    pub fn is_enabled(&self, backends: &BackendsConfig) -> bool {
        self.mounts.iter().all(|m| backends.is_enabled(m.upstream))
    }
}

const PROMETHEUS_API: &str = "/api/prometheus/api/";
const PROMETHEUS_TENANCY_API: &str = "/api/prometheus-tenancy/api/";

const KUBERNETES_MOUNTS: &[MountSpec] =
    &[MountSpec::subtree("/api/kubernetes/", UpstreamKind::Kubernetes)];

// Global queries go through the aggregation tier, rule evaluation through
// the primary engine.
const PROMETHEUS_MOUNTS: &[MountSpec] = &[
    MountSpec {
        pattern: "/api/prometheus/api/v1/query",
        strip: PROMETHEUS_API,
        upstream: UpstreamKind::Thanos,
    },
    MountSpec {
        pattern: "/api/prometheus/api/v1/query_range",
        strip: PROMETHEUS_API,
        upstream: UpstreamKind::Thanos,
    },
    MountSpec {
        pattern: "/api/prometheus/api/v1/label/",
        strip: PROMETHEUS_API,
        upstream: UpstreamKind::Thanos,
    },
    MountSpec {
        pattern: "/api/prometheus/api/v1/rules",
        strip: PROMETHEUS_API,
        upstream: UpstreamKind::Prometheus,
    },
    MountSpec {
        pattern: "/api/prometheus-tenancy/api/v1/query",
        strip: PROMETHEUS_TENANCY_API,
        upstream: UpstreamKind::ThanosTenancy,
    },
    MountSpec {
        pattern: "/api/prometheus-tenancy/api/v1/query_range",
        strip: PROMETHEUS_TENANCY_API,
        upstream: UpstreamKind::ThanosTenancy,
    },
];

const ALERTMANAGER_MOUNTS: &[MountSpec] =
    &[MountSpec::subtree("/api/alertmanager/api/", UpstreamKind::Alertmanager)];
const METERING_MOUNTS: &[MountSpec] =
    &[MountSpec::subtree("/api/metering/api/", UpstreamKind::Metering)];
const GRAFANA_MOUNTS: &[MountSpec] =
    &[MountSpec::subtree("/api/grafana/", UpstreamKind::Grafana)];
const KIALI_MOUNTS: &[MountSpec] = &[MountSpec::subtree("/api/kiali/", UpstreamKind::Kiali)];
const WEBHOOK_MOUNTS: &[MountSpec] =
    &[MountSpec::subtree("/api/webhook/", UpstreamKind::Webhook)];
const HYPERCLOUD_MOUNTS: &[MountSpec] =
    &[MountSpec::subtree("/api/hypercloud/", UpstreamKind::Hypercloud)];
const MULTI_HYPERCLOUD_MOUNTS: &[MountSpec] = &[MountSpec::subtree(
    "/api/multi-hypercloud/",
    UpstreamKind::MultiHypercloud,
)];
const KIBANA_MOUNTS: &[MountSpec] = &[MountSpec::subtree("/api/kibana/", UpstreamKind::Kibana)];
const KUBEFLOW_MOUNTS: &[MountSpec] =
    &[MountSpec::subtree("/api/kubeflow/", UpstreamKind::Kubeflow)];
const HELM_CHART_REPO_MOUNTS: &[MountSpec] = &[MountSpec {
    pattern: "/api/helm/charts/index.yaml",
    strip: "/api/helm/charts/",
    upstream: UpstreamKind::HelmChartRepo,
}];

/// Every backend the console can front.
pub const DESCRIPTORS: &[BackendDescriptor] = &[
    BackendDescriptor {
        console_origin: true,
        ..BackendDescriptor::injected("kubernetes", KUBERNETES_MOUNTS)
    },
    BackendDescriptor::injected("prometheus", PROMETHEUS_MOUNTS),
    BackendDescriptor::injected("alertmanager", ALERTMANAGER_MOUNTS),
    BackendDescriptor::injected("metering", METERING_MOUNTS),
    // Grafana authenticates callers itself.
    BackendDescriptor {
        credential: CredentialPolicy::None,
        ..BackendDescriptor::injected("grafana", GRAFANA_MOUNTS)
    },
    BackendDescriptor::injected("kiali", KIALI_MOUNTS),
    BackendDescriptor::injected("webhook", WEBHOOK_MOUNTS),
    BackendDescriptor::injected("hypercloud", HYPERCLOUD_MOUNTS),
    BackendDescriptor::injected("multi-hypercloud", MULTI_HYPERCLOUD_MOUNTS),
    BackendDescriptor::injected("kibana", KIBANA_MOUNTS),
    BackendDescriptor::injected("kubeflow", KUBEFLOW_MOUNTS),
    BackendDescriptor {
        name: "helm-chart-repo",
        mounts: HELM_CHART_REPO_MOUNTS,
        credential: CredentialPolicy::None,
        guard: Guard::Public,
        console_origin: false,
    },
];

/// A backend route at its absolute pattern.
#[derive(Debug, Clone)]
pub struct Mount {
    pub pattern: String,
    pub guard: Guard,
    pub route: Arc<BackendRoute>,
}

/// Enabled backends and the upstream clients built for them.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    mounts: Vec<Mount>,
    upstreams: HashMap<UpstreamKind, Upstream>,
}

impl BackendRegistry {
    /// Build every configured upstream and mount every enabled descriptor.
    ///
    /// Upstreams that no descriptor mounts (the helm service) are still
    /// built so local handlers can reach them. `origin` is sent as `Origin`
    /// by descriptors that ask for it.
    pub fn build(
        backends: &BackendsConfig,
        base_path: &str,
        origin: Option<&HeaderValue>,
    ) -> Result<Self, ProxyError> {
        let upstreams = build_upstreams(backends)?;

        let mut mounts = Vec::new();
        for descriptor in DESCRIPTORS {
            if !descriptor.is_enabled(backends) {
                continue;
            }
            for spec in descriptor.mounts {
                let Some(upstream) = upstreams.get(&spec.upstream) else {
                    continue;
                };
                let mut forwarder = HttpForwarder::new(upstream.clone());
                if let (true, Some(origin)) = (descriptor.console_origin, origin) {
                    forwarder = forwarder.with_origin(origin.clone());
                }
                mounts.push(mount(base_path, descriptor, spec, Arc::new(forwarder)));
            }
            info!("backend {} enabled", descriptor.name);
        }

        Ok(Self { mounts, upstreams })
    }

    /// Mount enabled descriptors on caller-supplied forwarders. Upstream
    /// clients are still built so local handlers see the same registry.
    #[cfg(test)]
    pub(crate) fn with_forwarders<F>(backends: &BackendsConfig, base_path: &str, mut forwarder: F) -> Self
    where
        F: FnMut(UpstreamKind) -> Arc<dyn Forward>,
    {
        let mut mounts = Vec::new();
        for descriptor in DESCRIPTORS {
            if !descriptor.is_enabled(backends) {
                continue;
            }
            for spec in descriptor.mounts {
                mounts.push(mount(base_path, descriptor, spec, forwarder(spec.upstream)));
            }
        }
        let upstreams = build_upstreams(backends).expect("test endpoints are valid");
        Self { mounts, upstreams }
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    pub fn upstream(&self, kind: UpstreamKind) -> Option<&Upstream> {
        self.upstreams.get(&kind)
    }
}

const ALL_UPSTREAMS: [UpstreamKind; 15] = [
    UpstreamKind::Kubernetes,
    UpstreamKind::Prometheus,
    UpstreamKind::Thanos,
    UpstreamKind::ThanosTenancy,
    UpstreamKind::Alertmanager,
    UpstreamKind::Metering,
    UpstreamKind::Grafana,
    UpstreamKind::Kiali,
    UpstreamKind::Webhook,
    UpstreamKind::Hypercloud,
    UpstreamKind::MultiHypercloud,
    UpstreamKind::Kibana,
    UpstreamKind::Kubeflow,
    UpstreamKind::Helm,
    UpstreamKind::HelmChartRepo,
];

fn build_upstreams(
    backends: &BackendsConfig,
) -> Result<HashMap<UpstreamKind, Upstream>, ProxyError> {
    let mut upstreams = HashMap::new();
    for kind in ALL_UPSTREAMS {
        if let Some(config) = backends.get(kind) {
            upstreams.insert(kind, Upstream::from_config(kind.name(), config)?);
        }
    }
    Ok(upstreams)
}

fn mount(
    base_path: &str,
    descriptor: &BackendDescriptor,
    spec: &MountSpec,
    forwarder: Arc<dyn Forward>,
) -> Mount {
    let pattern = single_joining_slash(base_path, spec.pattern);
    let route = BackendRoute::new(
        descriptor.name,
        pattern.clone(),
        single_joining_slash(base_path, spec.strip),
        forwarder,
        descriptor.credential,
    );
    Mount {
        pattern,
        guard: descriptor.guard,
        route: Arc::new(route),
    }
}
