//! Backend endpoint configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Upstream service a backend route forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamKind {
    Kubernetes,
    Prometheus,
    Thanos,
    ThanosTenancy,
    Alertmanager,
    Metering,
    Grafana,
    Kiali,
    Webhook,
    Hypercloud,
    MultiHypercloud,
    Kibana,
    Kubeflow,
    Helm,
    HelmChartRepo,
}

impl UpstreamKind {
    /// Config key under `[backends]`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Kubernetes => "kubernetes",
            Self::Prometheus => "prometheus",
            Self::Thanos => "thanos",
            Self::ThanosTenancy => "thanos_tenancy",
            Self::Alertmanager => "alertmanager",
            Self::Metering => "metering",
            Self::Grafana => "grafana",
            Self::Kiali => "kiali",
            Self::Webhook => "webhook",
            Self::Hypercloud => "hypercloud",
            Self::MultiHypercloud => "multi_hypercloud",
            Self::Kibana => "kibana",
            Self::Kubeflow => "kubeflow",
            Self::Helm => "helm",
            Self::HelmChartRepo => "helm_chart_repo",
        }
    }
}

/// One backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; the backend is disabled when empty.
    pub endpoint: String,

    /// PEM bundle trusted in addition to the system roots.
    pub ca_file: Option<PathBuf>,

    pub insecure_skip_verify: bool,

    pub connect_timeout_secs: u64,

    /// Total request timeout. Unset means no limit, which long-lived
    /// watch requests need.
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            ca_file: None,
            insecure_skip_verify: false,
            connect_timeout_secs: 10,
            timeout_secs: None,
        }
    }
}

impl BackendConfig {
    pub fn is_enabled(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }
}

/// `[backends]` section: every backend is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    pub kubernetes: Option<BackendConfig>,
    pub prometheus: Option<BackendConfig>,
    pub thanos: Option<BackendConfig>,
    pub thanos_tenancy: Option<BackendConfig>,
    pub alertmanager: Option<BackendConfig>,
    pub metering: Option<BackendConfig>,
    pub grafana: Option<BackendConfig>,
    pub kiali: Option<BackendConfig>,
    pub webhook: Option<BackendConfig>,
    pub hypercloud: Option<BackendConfig>,
    pub multi_hypercloud: Option<BackendConfig>,
    pub kibana: Option<BackendConfig>,
    pub kubeflow: Option<BackendConfig>,
    pub helm: Option<BackendConfig>,
    pub helm_chart_repo: Option<BackendConfig>,
}

impl BackendsConfig {
    fn slot(&self, kind: UpstreamKind) -> &Option<BackendConfig> {
        match kind {
            UpstreamKind::Kubernetes => &self.kubernetes,
            UpstreamKind::Prometheus => &self.prometheus,
            UpstreamKind::Thanos => &self.thanos,
            UpstreamKind::ThanosTenancy => &self.thanos_tenancy,
            UpstreamKind::Alertmanager => &self.alertmanager,
            UpstreamKind::Metering => &self.metering,
            UpstreamKind::Grafana => &self.grafana,
            UpstreamKind::Kiali => &self.kiali,
            UpstreamKind::Webhook => &self.webhook,
            UpstreamKind::Hypercloud => &self.hypercloud,
            UpstreamKind::MultiHypercloud => &self.multi_hypercloud,
            UpstreamKind::Kibana => &self.kibana,
            UpstreamKind::Kubeflow => &self.kubeflow,
            UpstreamKind::Helm => &self.helm,
            UpstreamKind::HelmChartRepo => &self.helm_chart_repo,
        }
    }

    /// Config for `kind`, only if it has a non-empty endpoint.
    pub fn get(&self, kind: UpstreamKind) -> Option<&BackendConfig> {
        self.slot(kind).as_ref().filter(|c| c.is_enabled())
    }

    pub fn is_enabled(&self, kind: UpstreamKind) -> bool {
        self.get(kind).is_some()
    }

    /// Set the endpoint for `kind`, keeping other settings.
    pub fn set_endpoint(&mut self, kind: UpstreamKind, endpoint: impl Into<String>) {
        let slot = match kind {
            UpstreamKind::Kubernetes => &mut self.kubernetes,
            UpstreamKind::Prometheus => &mut self.prometheus,
            UpstreamKind::Thanos => &mut self.thanos,
            UpstreamKind::ThanosTenancy => &mut self.thanos_tenancy,
            UpstreamKind::Alertmanager => &mut self.alertmanager,
            UpstreamKind::Metering => &mut self.metering,
            UpstreamKind::Grafana => &mut self.grafana,
            UpstreamKind::Kiali => &mut self.kiali,
            UpstreamKind::Webhook => &mut self.webhook,
            UpstreamKind::Hypercloud => &mut self.hypercloud,
            UpstreamKind::MultiHypercloud => &mut self.multi_hypercloud,
            UpstreamKind::Kibana => &mut self.kibana,
            UpstreamKind::Kubeflow => &mut self.kubeflow,
            UpstreamKind::Helm => &mut self.helm,
            UpstreamKind::HelmChartRepo => &mut self.helm_chart_repo,
        };
        slot.get_or_insert_with(BackendConfig::default).endpoint = endpoint.into();
    }
}
