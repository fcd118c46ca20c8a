use anyhow::{Context, anyhow};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::ca_store::{CaMaterialStore, EnsureOutcome};
use pkg_pki::ca::generate_certificate;
use pkg_state::leader::LeadershipOracle;
use pkg_state::relation::RelationTransport;
use pkg_state::secrets::SecretBackend;
use pkg_state::status::StatusSink;
use pkg_types::certificate::{CertificateRequest, ProviderCertificate};
use pkg_types::config::ConfigSource;
use pkg_types::secret::CaMaterial;
use pkg_types::status::UnitStatus;
use pkg_types::subject::SubjectConfig;

/// Everything one invocation needs from the outside world.
///
/// Built fresh for every trigger; nothing here is cached between runs.
#[derive(Clone)]
pub struct HookContext {
    pub config: Arc<dyn ConfigSource>,
    pub secrets: Arc<dyn SecretBackend>,
    pub relations: Arc<dyn RelationTransport>,
    pub leadership: Arc<dyn LeadershipOracle>,
    pub status: Arc<dyn StatusSink>,
    /// Integration name outstanding requests are listed for.
    pub integration: String,
}

/// Step at which a single request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceStage {
    Sign,
    Publish,
}

impl std::fmt::Display for IssuanceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssuanceStage::Sign => write!(f, "sign"),
            IssuanceStage::Publish => write!(f, "publish"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    Issued,
    Failed { stage: IssuanceStage, error: String },
}

/// Result of handling one outstanding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub relation_id: String,
    pub common_name: String,
    pub status: RequestStatus,
}

/// Per-request results of one pass over the outstanding requests, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuanceReport {
    pub outcomes: Vec<RequestOutcome>,
}

impl IssuanceReport {
    pub fn issued(&self) -> impl Iterator<Item = &RequestOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == RequestStatus::Issued)
    }

    pub fn failed(&self) -> impl Iterator<Item = &RequestOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status != RequestStatus::Issued)
    }
}

/// How an invocation ended when no fatal error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// This unit is not the leader; nothing was done.
    NotLeader,
    /// The subject configuration is invalid; carries the validation message.
    InvalidConfig(String),
    /// CA material is in place and every discoverable request was attempted.
    Active(IssuanceReport),
}

impl HookOutcome {
    /// Unit status reported for this outcome.
    pub fn status(&self) -> UnitStatus {
        match self {
            HookOutcome::NotLeader => UnitStatus::blocked("Unit is not leader"),
            HookOutcome::InvalidConfig(reason) => {
                UnitStatus::blocked(format!("Invalid config: {}", reason))
            }
            HookOutcome::Active(_) => UnitStatus::active(),
        }
    }
}

/// Drives the issuance state machine: leadership, config, CA material,
/// outstanding requests, status. Each step gates the next.
pub struct IssuanceController {
    ctx: HookContext,
    ca_store: CaMaterialStore,
}

impl IssuanceController {
    pub fn new(ctx: HookContext) -> Self {
        let ca_store = CaMaterialStore::new(ctx.secrets.clone());
        Self { ctx, ca_store }
    }

    /// Run one invocation from the top.
    ///
    /// Fatal errors (leadership oracle, CA material, request listing) are
    /// returned and leave the previously reported status untouched.
    #[instrument(name = "handle hook", skip_all)]
    pub async fn handle_hook(&self) -> anyhow::Result<HookOutcome> {
        let is_leader = self
            .ctx
            .leadership
            .is_leader()
            .await
            .context("could not check if unit is leader")?;
        if !is_leader {
            info!("Unit is not leader");
            return self.finish(HookOutcome::NotLeader).await;
        }

        let subject = match self.validate_config() {
            Ok(subject) => subject,
            Err(e) => return self.finish(HookOutcome::InvalidConfig(e.to_string())).await,
        };

        self.ensure_root_certificate(&subject)
            .await
            .context("could not generate and store root certificate")?;

        let report = self
            .process_outstanding_requests()
            .await
            .context("could not process outstanding certificate requests")?;

        self.finish(HookOutcome::Active(report)).await
    }

    #[instrument(name = "validate config", skip_all)]
    fn validate_config(&self) -> anyhow::Result<SubjectConfig> {
        let subject = SubjectConfig::load(self.ctx.config.as_ref());
        if let Err(e) = subject.validate() {
            warn!("Config is not valid: {}", e);
            return Err(e);
        }
        Ok(subject)
    }

    /// Create the root CA if it does not exist yet.
    #[instrument(name = "ensure ca", skip_all)]
    pub async fn ensure_root_certificate(
        &self,
        subject: &SubjectConfig,
    ) -> anyhow::Result<EnsureOutcome> {
        self.ca_store.ensure_root_certificate(subject).await
    }

    /// Sign and publish every outstanding request, in the order the transport returns them.
    ///
    /// A request that fails to sign or publish is recorded and skipped; it
    /// stays outstanding for the next invocation. Failing to list requests
    /// or to read the CA material aborts the whole pass.
    #[instrument(name = "process requests", skip_all)]
    pub async fn process_outstanding_requests(&self) -> anyhow::Result<IssuanceReport> {
        let requests = self
            .ctx
            .relations
            .list_outstanding_requests(&self.ctx.integration)
            .await
            .context("could not get outstanding certificate requests")?;

        let mut report = IssuanceReport::default();
        for request in requests {
            info!(
                "Received a certificate signing request from {} with common name {}",
                request.relation_id, request.common_name
            );

            let material = self
                .ca_store
                .get()
                .await?
                .ok_or_else(|| anyhow!("CA certificate secret not found"))?;

            let status = match self.issue(&request, &material).await {
                Ok(()) => {
                    info!("Provided certificate to {}", request.relation_id);
                    RequestStatus::Issued
                }
                Err((stage, e)) => {
                    warn!(
                        "Could not {} certificate for {}: {:#}",
                        stage, request.relation_id, e
                    );
                    RequestStatus::Failed {
                        stage,
                        error: format!("{:#}", e),
                    }
                }
            };

            report.outcomes.push(RequestOutcome {
                relation_id: request.relation_id,
                common_name: request.common_name,
                status,
            });
        }

        Ok(report)
    }

    async fn issue(
        &self,
        request: &CertificateRequest,
        material: &CaMaterial,
    ) -> Result<(), (IssuanceStage, anyhow::Error)> {
        let certificate = generate_certificate(
            &material.private_key,
            &material.ca_certificate,
            &request.csr,
        )
        .map_err(|e| (IssuanceStage::Sign, e))?;

        let record = ProviderCertificate::issued(request, certificate, &material.ca_certificate);
        self.ctx
            .relations
            .publish_certificate(&request.relation_id, &record)
            .await
            .map_err(|e| (IssuanceStage::Publish, e))
    }

    async fn finish(&self, outcome: HookOutcome) -> anyhow::Result<HookOutcome> {
        let status = outcome.status();
        if let Err(e) = self.ctx.status.set_unit_status(&status).await {
            error!("Could not set status: {:#}", e);
            return Err(e.context("could not set unit status"));
        }
        Ok(outcome)
    }
}
