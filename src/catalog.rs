//! Builtin node categories.
//!
//! Each glyph is drawn as a small vector badge in its brand colour, so the
//! renderer needs no bundled raster assets for them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OnPrem,
    Gcp,
    K8s,
    Saas,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnPrem => "onprem",
            Self::Gcp => "gcp",
            Self::K8s => "k8s",
            Self::Saas => "saas",
        }
    }
}

/// Badge outline drawn behind the mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeShape {
    Circle,
    RoundedSquare,
    Hexagon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    // onprem
    Users,
    Istio,
    PostgreSql,
    Prometheus,
    Grafana,
    Loki,
    Fluentbit,
    Flux,
    Argocd,
    Github,
    Kafka,
    Vault,
    Trivy,
    Airflow,
    Tekton,
    Terraform,
    // saas
    Cloudflare,
    Slack,
    // gcp
    Nat,
    LoadBalancing,
    Storage,
    // k8s
    Pod,
    StatefulSet,
    Job,
    Hpa,
    ChaosMesh,
    ExternalDns,
    Helm,
    Kustomize,
}

impl Glyph {
    pub const ALL: [Glyph; 29] = [
        Glyph::Users,
        Glyph::Istio,
        Glyph::PostgreSql,
        Glyph::Prometheus,
        Glyph::Grafana,
        Glyph::Loki,
        Glyph::Fluentbit,
        Glyph::Flux,
        Glyph::Argocd,
        Glyph::Github,
        Glyph::Kafka,
        Glyph::Vault,
        Glyph::Trivy,
        Glyph::Airflow,
        Glyph::Tekton,
        Glyph::Terraform,
        Glyph::Cloudflare,
        Glyph::Slack,
        Glyph::Nat,
        Glyph::LoadBalancing,
        Glyph::Storage,
        Glyph::Pod,
        Glyph::StatefulSet,
        Glyph::Job,
        Glyph::Hpa,
        Glyph::ChaosMesh,
        Glyph::ExternalDns,
        Glyph::Helm,
        Glyph::Kustomize,
    ];

    pub fn provider(self) -> Provider {
        match self {
            Self::Users
            | Self::Istio
            | Self::PostgreSql
            | Self::Prometheus
            | Self::Grafana
            | Self::Loki
            | Self::Fluentbit
            | Self::Flux
            | Self::Argocd
            | Self::Github
            | Self::Kafka
            | Self::Vault
            | Self::Trivy
            | Self::Airflow
            | Self::Tekton
            | Self::Terraform => Provider::OnPrem,
            Self::Cloudflare | Self::Slack => Provider::Saas,
            Self::Nat | Self::LoadBalancing | Self::Storage => Provider::Gcp,
            Self::Pod
            | Self::StatefulSet
            | Self::Job
            | Self::Hpa
            | Self::ChaosMesh
            | Self::ExternalDns
            | Self::Helm
            | Self::Kustomize => Provider::K8s,
        }
    }

    /// Category path in `provider.group.Name` form.
    pub fn category(self) -> &'static str {
        match self {
            Self::Users => "onprem.client.Users",
            Self::Istio => "onprem.network.Istio",
            Self::PostgreSql => "onprem.database.PostgreSQL",
            Self::Prometheus => "onprem.monitoring.Prometheus",
            Self::Grafana => "onprem.monitoring.Grafana",
            Self::Loki => "onprem.logging.Loki",
            Self::Fluentbit => "onprem.logging.Fluentbit",
            Self::Flux => "onprem.gitops.Flux",
            Self::Argocd => "onprem.gitops.Argocd",
            Self::Github => "onprem.vcs.Github",
            Self::Kafka => "onprem.queue.Kafka",
            Self::Vault => "onprem.security.Vault",
            Self::Trivy => "onprem.security.Trivy",
            Self::Airflow => "onprem.workflow.Airflow",
            Self::Tekton => "onprem.cd.Tekton",
            Self::Terraform => "onprem.iac.Terraform",
            Self::Cloudflare => "saas.cdn.Cloudflare",
            Self::Slack => "saas.chat.Slack",
            Self::Nat => "gcp.network.NAT",
            Self::LoadBalancing => "gcp.network.LoadBalancing",
            Self::Storage => "gcp.storage.Storage",
            Self::Pod => "k8s.compute.Pod",
            Self::StatefulSet => "k8s.compute.StatefulSet",
            Self::Job => "k8s.compute.Job",
            Self::Hpa => "k8s.clusterconfig.HPA",
            Self::ChaosMesh => "k8s.chaos.ChaosMesh",
            Self::ExternalDns => "k8s.ecosystem.ExternalDns",
            Self::Helm => "k8s.ecosystem.Helm",
            Self::Kustomize => "k8s.ecosystem.Kustomize",
        }
    }

    /// Short text drawn inside the badge.
    pub fn mark(self) -> &'static str {
        match self {
            Self::Users => "USR",
            Self::Istio => "IST",
            Self::PostgreSql => "PG",
            Self::Prometheus => "PRM",
            Self::Grafana => "GRF",
            Self::Loki => "LOK",
            Self::Fluentbit => "FB",
            Self::Flux => "FLX",
            Self::Argocd => "ARG",
            Self::Github => "GH",
            Self::Kafka => "KFK",
            Self::Vault => "VLT",
            Self::Trivy => "TRV",
            Self::Airflow => "AF",
            Self::Tekton => "TKN",
            Self::Terraform => "TF",
            Self::Cloudflare => "CF",
            Self::Slack => "SLK",
            Self::Nat => "NAT",
            Self::LoadBalancing => "LB",
            Self::Storage => "GCS",
            Self::Pod => "pod",
            Self::StatefulSet => "sts",
            Self::Job => "job",
            Self::Hpa => "hpa",
            Self::ChaosMesh => "CM",
            Self::ExternalDns => "DNS",
            Self::Helm => "HLM",
            Self::Kustomize => "KUS",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Users => "#2D3436",
            Self::Istio => "#466BB0",
            Self::PostgreSql => "#336791",
            Self::Prometheus => "#E6522C",
            Self::Grafana => "#F46800",
            Self::Loki => "#F2B13D",
            Self::Fluentbit => "#49BDA5",
            Self::Flux => "#316CE6",
            Self::Argocd => "#EF7B4D",
            Self::Github => "#24292E",
            Self::Kafka => "#231F20",
            Self::Vault => "#000000",
            Self::Trivy => "#1904DA",
            Self::Airflow => "#017CEE",
            Self::Tekton => "#FD495C",
            Self::Terraform => "#7B42BC",
            Self::Cloudflare => "#F38020",
            Self::Slack => "#4A154B",
            Self::Nat | Self::LoadBalancing | Self::Storage => "#4285F4",
            Self::Pod
            | Self::StatefulSet
            | Self::Job
            | Self::Hpa
            | Self::ExternalDns
            | Self::Kustomize => "#326CE5",
            Self::ChaosMesh => "#E23C3C",
            Self::Helm => "#0F1689",
        }
    }

    pub fn badge(self) -> BadgeShape {
        match self.provider() {
            Provider::K8s => BadgeShape::Hexagon,
            Provider::Gcp => BadgeShape::RoundedSquare,
            Provider::OnPrem | Provider::Saas => BadgeShape::Circle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn categories_are_unique_and_match_provider() {
        let mut seen = HashSet::new();
        for glyph in Glyph::ALL {
            assert!(seen.insert(glyph.category()), "{glyph:?}");
            assert!(glyph.category().starts_with(glyph.provider().as_str()));
        }
    }

    #[test]
    fn marks_fit_in_badge() {
        for glyph in Glyph::ALL {
            assert!(!glyph.mark().is_empty());
            assert!(glyph.mark().chars().count() <= 3, "{glyph:?}");
            assert!(glyph.color().starts_with('#'));
        }
    }
}
