//! The Finure high level workflow: every node, cluster and edge of the diagram.

use crate::catalog::Glyph;
use crate::ir::{
    ClusterAttrs, Diagram, DiagramOptions, Direction, EdgeAttrs, EdgeStyle,
    GraphAttrs, Icon, NodeId, OutputFormat, Splines,
};

pub const NAME: &str = "Finure high level workflow";
pub const FILENAME: &str = "finure_arch";

const GREY: &str = "#888";
const DATA: &str = "#6a8caf";
const SEED: &str = "#4c8eda";
const CICD: &str = "#7b8cde";
const FLAGGER: &str = "#ff6b6b";
const INSTRUMENTATION: &str = "#00d4aa";
const CHAOS: &str = "#ff9500";
const SUBTLE: &str = "#9aa4ad";
const EGRESS: &str = "#b3b3b3";

pub fn finure_options() -> DiagramOptions {
    DiagramOptions {
        filename: Some(FILENAME.to_string()),
        format: OutputFormat::Png,
        graph: GraphAttrs {
            rankdir: Direction::LeftRight,
            splines: Splines::Spline,
            pad: 0.3,
            nodesep: 0.55,
            ranksep: 0.9,
            fontname: "Inter".to_string(),
            ..GraphAttrs::default()
        },
    }
}

pub fn finure_diagram() -> Diagram {
    let mut diagram = Diagram::with_options(NAME, finure_options());
    declare_finure(&mut diagram);
    diagram
}

fn custom(file: &str) -> Icon {
    Icon::custom(format!("./icons/{file}.png"))
}

fn dashed(label: &str, color: &str) -> EdgeAttrs {
    EdgeAttrs::dashed(color).label(label)
}

/// Declares the full Finure architecture into `d`.
pub fn declare_finure(d: &mut Diagram) {
    let user = d.node("User", Glyph::Users);
    let cloudflare = d.node("Cloudflare", Glyph::Cloudflare);
    let nlb = d.node("Network LB", Glyph::LoadBalancing);
    let gcs_raw = d.node("GCS Raw Data", Glyph::Storage);
    let gcs_formatted = d.node("GCS Formatted Data", Glyph::Storage);
    let gcs_models = d.node("GCS Models", Glyph::Storage);
    let gcs_logs = d.node("GCS Logs", Glyph::Storage);
    let gcs_bkp = d.node("GCS Backups", Glyph::Storage);
    let slack = d.node("Slack", Glyph::Slack);
    let github = d.node("GitHub Repo", Glyph::Github);
    let ghcr = d.node("GHCR", Glyph::Github);
    let terraform = d.node("Terraform", Glyph::Terraform);
    let kaggle = d.node("Kaggle", custom("kaggle"));
    let seed_job = d.node("seed-job (bootstrap)", Glyph::Job);

    let c = d.cluster("Cluster", ClusterAttrs::default(), |d| {
        let cloud_nat = d.node("Cloud NAT", Glyph::Nat);
        let (k8s_gateway, istio_controller) =
            d.cluster("Ingress Layer", ClusterAttrs::dashed(), |d| {
                (
                    d.node("K8s Gateway API", custom("k8s-gateway-api")),
                    d.node("Istio Controller", Glyph::Istio),
                )
            });

        InCluster {
            cloud_nat,
            k8s_gateway,
            istio_controller,
            fe_pod: d.node("frontend-pod", Glyph::Pod),
            mw_pod: d.node("middleware-pod", Glyph::Pod),
            kafka: d.node("Kafka Cluster", Glyph::Kafka),
            be_pod: d.node("backend-pod", Glyph::Pod),
            kserve_pod: d.node("KServe", custom("kserve")),
            hpa_fe: d.node("HPA: frontend", Glyph::Hpa),
            hpa_mw: d.node("HPA: middleware", Glyph::Hpa),
            hpa_kserve: d.node("HPA: kserve", Glyph::Hpa),
            keda: d.node("KEDA (Kafka scaler)", custom("keda")),
            knative: d.node("Knative Serving", custom("knative")),
            cnpg: d.node("PostgreSQL Cluster (3 replicas)", Glyph::StatefulSet),
            postgres: d.node("Postgres DB", Glyph::PostgreSql),
            cnpg_op: d.node("CNPG Operator", custom("cnpg-operator")),
            prom: d.node("Prometheus", Glyph::Prometheus),
            graf: d.node("Grafana", Glyph::Grafana),
            loki: d.node("Loki", Glyph::Loki),
            fluentbit: d.node("Fluent Bit", Glyph::Fluentbit),
            kiali: d.node("Kiali", custom("kiali")),
            certmgr: d.node("cert-manager", custom("cert-manager")),
            extdns: d.node("external-dns", Glyph::ExternalDns),
            eso: d.node("External Secrets Operator", custom("external-secrets")),
            kyverno: d.node("Kyverno", custom("kyverno")),
            velero: d.node("Velero", custom("velero")),
            flux: d.node("Flux", Glyph::Flux),
            kustomize: d.node("Kustomize", Glyph::Kustomize),
            vault: d.node("Vault", Glyph::Vault),
            opencost: d.node("OpenCost", custom("opencost")),
            airflow: d.node("Airflow DAG", Glyph::Airflow),
            argo_events: d.node("Argo Events", Glyph::Argocd),
            argo_workflows: d.node("Argo Workflows", Glyph::Argocd),
            tekton: d.node("Tekton", Glyph::Tekton),
            sonar: d.node("SonarQube", custom("sonarqube")),
            trivy: d.node("Trivy", Glyph::Trivy),
            snyk: d.node("Snyk", custom("snyk")),
            helm: d.node("Helm", Glyph::Helm),
            cluster_node: d.node("", custom("gke-cluster")),
            beyla: d.node("Beyla", custom("beyla")),
            otel_collector: d.node("OpenTelemetry Collector", custom("otel")),
            signoz: d.node("SigNoz", custom("signoz")),
            flagger: d.node("Flagger", custom("flagger")),
            chaos_mesh: d.node("Chaos Mesh", Glyph::ChaosMesh),
        }
    });

    // Request path. Only the first hop of each chain carries the label.
    d.connect(user, cloudflare, EdgeAttrs::labeled("HTTPS"));
    d.chain(&[cloudflare, nlb, c.k8s_gateway], EdgeAttrs::new());
    d.connect(c.k8s_gateway, c.fe_pod, EdgeAttrs::new());
    d.connect(c.fe_pod, c.mw_pod, EdgeAttrs::labeled("HTTP"));

    // `>>` always sends dir=forward, whatever the edge declared.
    d.connect(c.k8s_gateway, c.istio_controller, dashed("managed by", GREY));
    d.connect(c.mw_pod, c.kafka, EdgeAttrs::labeled("produce"));
    d.connect(c.kafka, c.be_pod, EdgeAttrs::labeled("consume"));
    d.connect(c.be_pod, c.kserve_pod, EdgeAttrs::labeled("inference"));
    d.connect(c.kserve_pod, c.knative, dashed("serverless", GREY));

    // App database
    d.connect(c.be_pod, c.postgres, EdgeAttrs::labeled("insert record"));
    d.connect(c.cnpg, c.postgres, dashed("manages", GREY));
    d.connect(c.cnpg, gcs_bkp, dashed("backups", DATA));
    d.connect(c.cnpg_op, c.cnpg, EdgeAttrs::dashed(GREY));

    // Seed job
    d.connect(kaggle, seed_job, dashed("download dataset", SEED));
    d.connect(seed_job, c.postgres, dashed("validate & push seed data", SEED));

    // Data and ML pipeline
    d.connect(gcs_raw, c.airflow, dashed("new dataset", DATA));
    d.connect(c.airflow, gcs_formatted, dashed("save clean data", DATA));
    d.connect(c.airflow, c.argo_events, dashed("event", DATA));
    d.connect(c.argo_events, c.argo_workflows, dashed("trigger", DATA));
    d.connect(c.argo_workflows, gcs_formatted, dashed("read raw data", DATA));
    d.connect(c.argo_workflows, gcs_models, dashed("train & save model", DATA));
    d.connect(gcs_models, c.kserve_pod, dashed("new model", DATA));
    d.connect(c.knative, c.kserve_pod, dashed("update", DATA));

    // CI/CD
    d.connect(github, c.tekton, dashed("webhook", CICD));
    d.connect(c.tekton, c.sonar, dashed("static analysis", CICD));
    d.connect(c.tekton, c.trivy, dashed("image scan", CICD));
    d.connect(c.tekton, c.snyk, dashed("vuln scan", CICD));
    d.connect(c.tekton, c.helm, dashed("update", CICD));
    d.connect(c.tekton, ghcr, dashed("push image", CICD));
    d.connect(c.tekton, github, dashed("commit changes", CICD));
    d.connect(c.flux, c.kustomize, dashed("uses", CICD));
    d.connect(c.flux, slack, dashed("flux deploy notifications", CICD));
    d.connect(c.tekton, slack, dashed("tekton pipeline notifications", CICD));
    d.connect(c.airflow, slack, dashed("airflow pipeline alerts", CICD));

    let workloads = [c.fe_pod, c.mw_pod, c.be_pod];

    // Progressive delivery
    d.fan_out(c.flagger, &workloads, dashed("blue/green progressive delivery", FLAGGER));
    d.connect(c.flagger, c.istio_controller, dashed("works with", FLAGGER));

    // Auto-instrumentation
    d.fan_out(c.beyla, &workloads, dashed("auto-instrument", INSTRUMENTATION));
    d.connect(c.beyla, c.otel_collector, dashed("send metrics", INSTRUMENTATION));
    d.connect(c.otel_collector, c.signoz, dashed("export to", INSTRUMENTATION));

    // Chaos engineering
    d.fan_out(c.chaos_mesh, &workloads, dashed("chaos experiments", CHAOS));

    // Observability
    for w in [c.fe_pod, c.mw_pod, c.be_pod, c.kserve_pod] {
        d.connect(w, c.prom, dashed("metrics scrape", SUBTLE));
        d.connect(w, c.fluentbit, dashed("logs", SUBTLE));
    }
    d.connect(c.prom, c.graf, EdgeAttrs::dashed(SUBTLE));
    d.connect(c.fluentbit, c.loki, dashed("to Loki", SUBTLE));
    d.connect(c.loki, gcs_logs, dashed("storage", SUBTLE));
    d.connect(c.loki, c.graf, dashed("logs", SUBTLE));
    d.connect(c.istio_controller, c.kiali, dashed("mesh viz", SUBTLE));
    d.connect(c.opencost, c.prom, dashed("cost metrics", SUBTLE));

    // DNS and TLS
    d.connect(c.certmgr, cloudflare, dashed("DNS verification", SUBTLE));
    d.connect(c.extdns, cloudflare, dashed("DNS records", SUBTLE));

    // Secrets
    d.connect_back(c.vault, c.eso, dashed("fetch secrets", SUBTLE));
    d.fan_out(
        c.eso,
        &[c.fe_pod, c.mw_pod, c.be_pod, c.postgres],
        EdgeAttrs::dashed(SUBTLE),
    );

    // Policy and backups. The first Kyverno edge never gets a target.
    let _ = d.dangling(c.kyverno, dashed("validate/mutate", SUBTLE));
    d.fan_out(
        c.kyverno,
        &[c.fe_pod, c.mw_pod, c.be_pod, c.postgres, c.kserve_pod, c.knative],
        dashed("policies", SUBTLE),
    );
    d.connect(c.velero, gcs_bkp, dashed("backup cluster", SUBTLE));

    // Egress
    d.connect(
        c.be_pod,
        c.cloud_nat,
        EdgeAttrs::labeled("egress")
            .style(EdgeStyle::Dotted)
            .color(EGRESS),
    );

    // Infrastructure
    d.connect(terraform, c.cluster_node, dashed("provision", CICD));

    // Autoscaling
    d.connect(c.hpa_fe, c.fe_pod, dashed("scales", GREY));
    d.connect(c.hpa_mw, c.mw_pod, dashed("scales", GREY));
    d.connect(c.hpa_kserve, c.kserve_pod, dashed("scales", GREY));

    // KEDA
    d.connect(c.kafka, c.keda, dashed("scale on lag", GREY));
    d.connect(c.keda, c.be_pod, dashed("scales", GREY));
}

/// Handles for the nodes declared inside the "Cluster" group.
struct InCluster {
    cloud_nat: NodeId,
    k8s_gateway: NodeId,
    istio_controller: NodeId,
    fe_pod: NodeId,
    mw_pod: NodeId,
    kafka: NodeId,
    be_pod: NodeId,
    kserve_pod: NodeId,
    hpa_fe: NodeId,
    hpa_mw: NodeId,
    hpa_kserve: NodeId,
    keda: NodeId,
    knative: NodeId,
    cnpg: NodeId,
    postgres: NodeId,
    cnpg_op: NodeId,
    prom: NodeId,
    graf: NodeId,
    loki: NodeId,
    fluentbit: NodeId,
    kiali: NodeId,
    certmgr: NodeId,
    extdns: NodeId,
    eso: NodeId,
    kyverno: NodeId,
    velero: NodeId,
    flux: NodeId,
    kustomize: NodeId,
    vault: NodeId,
    opencost: NodeId,
    airflow: NodeId,
    argo_events: NodeId,
    argo_workflows: NodeId,
    tekton: NodeId,
    sonar: NodeId,
    trivy: NodeId,
    snyk: NodeId,
    helm: NodeId,
    cluster_node: NodeId,
    beyla: NodeId,
    otel_collector: NodeId,
    signoz: NodeId,
    flagger: NodeId,
    chaos_mesh: NodeId,
}
