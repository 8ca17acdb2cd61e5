//! Typed HTTP client for the clinic API.
//!
//! Mirrors how the front desk screens talk to the service: queue fetches
//! fall back to an empty list, every successful mutation refetches the
//! queue, the signature screen loads profile and session count together,
//! and a missing or blank signature is refused before any request is made.

use futures_util::future::try_join;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::queue::{AddToQueueResponse, StartAttendanceResponse};
use crate::api::types::{ApiResponse, CountResponse};
use crate::applications::{CreateApplicationRequest, CreatedApplication, DraftRequest};
use crate::ledger::{ChargeRequest, FinancialView, PaymentCart};
use crate::models::enums::ApplicationStatus;
use crate::models::{ApplicationDraft, Patient};
use crate::patients::PatientDetails;
use crate::queue::{self, AttendanceRoute, QueueEntry, QueueFilter, QueueSnapshot};
use crate::signature::{self, SignatureError};

/// Shown on the signature screen until the profile arrives.
pub const LOADING_NAME: &str = "Carregando...";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Signature is required")]
    EmptySignature,

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Text for the operator-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Http(_) => "Não foi possível conectar ao servidor.".into(),
            ClientError::Api { message, .. } => message.clone(),
            ClientError::EmptySignature => "Por favor, peça ao paciente para assinar.".into(),
            ClientError::InvalidSignature(detail) | ClientError::InvalidInput(detail) => {
                detail.clone()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionAction {
    session_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddToQueue {
    patient_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct DraftCreated {
    draft_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct LedgerWritten {
    ledger_id: Uuid,
}

/// Header data for the signature screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureContext {
    pub patient_name: String,
    /// Never below 1: the current attendance counts.
    pub session_count: u32,
}

impl Default for SignatureContext {
    fn default() -> Self {
        Self {
            patient_name: LOADING_NAME.into(),
            session_count: 1,
        }
    }
}

#[derive(Clone)]
pub struct ClinicClient {
    http: reqwest::Client,
    base_url: String,
}

impl ClinicClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let envelope: ApiResponse<T> = resp.json().await?;
            return Ok(envelope.data);
        }
        let text = resp.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(env) => (env.error.code, env.error.message),
            Err(_) => (
                "HTTP".to_string(),
                if text.trim().is_empty() {
                    status.to_string()
                } else {
                    text
                },
            ),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.http.get(self.url(path)).send().await?;
        Self::decode(resp).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let resp = self.http.post(self.url(path)).json(body).send().await?;
        Self::decode(resp).await
    }

    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        self.get("/health").await
    }

    // ── Queue ──────────────────────────────────────────────

    /// Today's queue. Failures are logged and yield an empty queue.
    pub async fn fetch_queue(&self) -> QueueSnapshot {
        match self.get::<QueueSnapshot>("/queue").await {
            Ok(snapshot) => {
                if snapshot.orphaned_sessions > 0 {
                    tracing::warn!(
                        orphaned = snapshot.orphaned_sessions,
                        "Queue has sessions without a patient"
                    );
                }
                snapshot
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch queue");
                QueueSnapshot::default()
            }
        }
    }

    pub async fn check_in(&self, session_id: Uuid) -> Result<QueueSnapshot, ClientError> {
        self.post::<_, ()>("/queue/checkin", &SessionAction { session_id }).await?;
        Ok(self.fetch_queue().await)
    }

    pub async fn remove_from_queue(&self, session_id: Uuid) -> Result<QueueSnapshot, ClientError> {
        self.post::<_, ()>("/queue/remove", &SessionAction { session_id }).await?;
        Ok(self.fetch_queue().await)
    }

    pub async fn add_to_queue(&self, patient_id: Uuid) -> Result<(Uuid, QueueSnapshot), ClientError> {
        let added: AddToQueueResponse = self.post("/queue/add", &AddToQueue { patient_id }).await?;
        Ok((added.session_id, self.fetch_queue().await))
    }

    /// Open the attendance and return the path of the next screen.
    pub async fn start_attendance(
        &self,
        session_id: Uuid,
        patient_id: Uuid,
    ) -> Result<(AttendanceRoute, String), ClientError> {
        let started: StartAttendanceResponse = self
            .post("/queue/start-attendance", &SessionAction { session_id })
            .await?;
        Ok((started.route, started.route.path(&patient_id)))
    }

    pub async fn session_application_count(&self, session_id: Uuid) -> Result<u32, ClientError> {
        let count: CountResponse = self
            .get(&format!("/sessions/{session_id}/applications/count"))
            .await?;
        Ok(count.count)
    }

    // ── Patients ───────────────────────────────────────────

    pub async fn patient(&self, id: Uuid) -> Result<Patient, ClientError> {
        self.get(&format!("/patients/{id}")).await
    }

    pub async fn patient_details(&self, id: Uuid) -> Result<PatientDetails, ClientError> {
        self.get(&format!("/patients/{id}/details")).await
    }

    pub async fn patient_session_count(&self, id: Uuid) -> Result<u32, ClientError> {
        let count: CountResponse = self.get(&format!("/patients/{id}/sessions/count")).await?;
        Ok(count.count)
    }

    /// Profile name and session count, requested together. Any failure
    /// is logged and the defaults are kept.
    pub async fn load_signature_context(&self, patient_id: Uuid) -> SignatureContext {
        let mut ctx = SignatureContext::default();
        match try_join(self.patient(patient_id), self.patient_session_count(patient_id)).await {
            Ok((patient, count)) => {
                if let Some(name) = patient.full_name {
                    ctx.patient_name = name;
                }
                ctx.session_count = count.max(1);
            }
            Err(e) => tracing::error!(%patient_id, error = %e, "Failed to load signature context"),
        }
        ctx
    }

    // ── Applications ───────────────────────────────────────

    pub async fn create_draft(&self, request: &DraftRequest) -> Result<Uuid, ClientError> {
        let created: DraftCreated = self.post("/applications/drafts", request).await?;
        Ok(created.draft_id)
    }

    pub async fn draft(&self, id: Uuid) -> Result<ApplicationDraft, ClientError> {
        self.get(&format!("/applications/drafts/{id}")).await
    }

    /// Submit a signed attendance. An empty or blank signature is refused
    /// locally.
    pub async fn submit_application(
        &self,
        request: &CreateApplicationRequest,
    ) -> Result<CreatedApplication, ClientError> {
        match signature::validate_signature(&request.signature) {
            Ok(()) => {}
            Err(SignatureError::Missing | SignatureError::Blank) => {
                return Err(ClientError::EmptySignature)
            }
            Err(e) => return Err(ClientError::InvalidSignature(e.to_string())),
        }
        self.post("/applications/create", request).await
    }

    // ── Financial ──────────────────────────────────────────

    pub async fn financial(&self, patient_id: Uuid) -> Result<FinancialView, ClientError> {
        self.get(&format!("/financial/{patient_id}")).await
    }

    pub async fn pay(&self, patient_id: Uuid, cart: &PaymentCart) -> Result<Uuid, ClientError> {
        if !cart.can_submit() {
            return Err(ClientError::InvalidInput(
                "Adicione ao menos uma forma de pagamento.".into(),
            ));
        }
        let written: LedgerWritten = self
            .post("/financial/pay", &cart.to_request(patient_id))
            .await?;
        Ok(written.ledger_id)
    }

    pub async fn charge(&self, request: &ChargeRequest) -> Result<Uuid, ClientError> {
        let written: LedgerWritten = self.post("/financial/charge", request).await?;
        Ok(written.ledger_id)
    }
}

/// Queue screen state: the last fetched snapshot and the operator's filter.
#[derive(Debug, Clone, Default)]
pub struct QueueView {
    snapshot: QueueSnapshot,
    filter: QueueFilter,
}

impl QueueView {
    pub fn new(snapshot: QueueSnapshot) -> Self {
        Self {
            snapshot,
            filter: QueueFilter::default(),
        }
    }

    pub async fn refresh(&mut self, client: &ClinicClient) {
        self.snapshot = client.fetch_queue().await;
    }

    pub fn replace(&mut self, snapshot: QueueSnapshot) {
        self.snapshot = snapshot;
    }

    pub fn toggle(&mut self, status: ApplicationStatus) {
        self.filter.toggle(status);
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
    }

    pub fn filter(&self) -> &QueueFilter {
        &self.filter
    }

    /// Entries to display, filtered and ranked.
    pub fn visible(&self) -> Vec<QueueEntry> {
        queue::rank(&self.snapshot.entries, &self.filter)
    }
}
