//! # Envelope Resolver
//!
//! [`AcrossIdModule`] is the descriptor the host registers. For each
//! resolution it validates config, samples geometry, builds the query, and
//! returns a [`PendingResolution`]; the host then runs it with a continuation.
//!
//! ## Guarantees
//!
//! - Invalid config is reported before any network work and yields no
//!   pending resolution at all.
//! - A pending resolution runs at most once (it is consumed) and calls its
//!   continuation exactly once, with `None` on every failure path.

use std::sync::Arc;

use acrossid_core::geometry::{EnvironmentProbe, GeometrySnapshot};
use acrossid_core::identity::{GVLID, MODULE_NAME};
use acrossid_core::submodule::{
    decode_envelope, envelope_eid_spec, BoxFuture, Continuation, DecodedId, EidSpec,
};
use acrossid_core::{build_query_params, ConsentContext, Envelope, IdCallback, IdSubmodule, PartnerId};
use tokio::task::JoinHandle;

use crate::config::{FailureSeverity, ResolverConfig};
use crate::error::ResolveError;
use crate::extract::extract_envelope;
use crate::transport::{HttpTransport, Transport, TransportRequest};

/// The 33Across identity provider.
#[derive(Clone)]
pub struct AcrossIdModule {
    transport: Arc<dyn Transport>,
    probe: Arc<dyn EnvironmentProbe>,
}

impl AcrossIdModule {
    pub fn new(transport: Arc<dyn Transport>, probe: Arc<dyn EnvironmentProbe>) -> Self {
        Self { transport, probe }
    }

    /// Module backed by a fresh [`HttpTransport`].
    pub fn with_http(probe: Arc<dyn EnvironmentProbe>) -> Result<Self, ResolveError> {
        Ok(Self::new(Arc::new(HttpTransport::new()?), probe))
    }

    /// Start a resolution from raw host params.
    ///
    /// Returns `None`, after logging, when the params carry no usable partner id.
    pub fn resolve(
        &self,
        params: &serde_json::Value,
        consent: &ConsentContext,
    ) -> Option<PendingResolution> {
        match ResolverConfig::from_params(params) {
            Ok(config) => Some(self.resolve_with(config, consent)),
            Err(e) => {
                tracing::error!(module = MODULE_NAME, error = %e, "cannot resolve envelope");
                None
            }
        }
    }

    /// Start a resolution from an already validated config.
    pub fn resolve_with(&self, config: ResolverConfig, consent: &ConsentContext) -> PendingResolution {
        let geometry = GeometrySnapshot::sample(self.probe.as_ref());
        let params = build_query_params(&config.pid, consent, &geometry, config.param_policy());

        PendingResolution {
            request: TransportRequest {
                url: config.api_url.clone(),
                params,
                timeout: config.timeout(),
                with_credentials: true,
            },
            pid: config.pid,
            severity: config.failure_severity,
            transport: Arc::clone(&self.transport),
        }
    }
}

impl IdSubmodule for AcrossIdModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn gvlid(&self) -> Option<u32> {
        Some(GVLID)
    }

    fn decode(&self, stored: &str) -> DecodedId {
        decode_envelope(stored)
    }

    fn get_id(
        &self,
        params: &serde_json::Value,
        consent: &ConsentContext,
    ) -> Option<Box<dyn IdCallback>> {
        self.resolve(params, consent)
            .map(|pending| Box::new(pending) as Box<dyn IdCallback>)
    }

    fn eids(&self) -> Vec<EidSpec> {
        vec![envelope_eid_spec()]
    }
}

/// A prepared lookup waiting for the host's continuation.
pub struct PendingResolution {
    request: TransportRequest,
    pid: PartnerId,
    severity: FailureSeverity,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for PendingResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResolution")
            .field("request", &self.request)
            .field("pid", &self.pid)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

impl PendingResolution {
    /// The request that will be sent.
    pub fn request(&self) -> &TransportRequest {
        &self.request
    }

    /// Perform the lookup and hand the outcome to `continuation`.
    pub async fn callback<F>(self, continuation: F)
    where
        F: FnOnce(Option<Envelope>) + Send,
    {
        let envelope = self.envelope().await;
        continuation(envelope);
    }

    /// Fire-and-forget variant of [`callback`](Self::callback) on the current
    /// tokio runtime.
    pub fn spawn<F>(self, continuation: F) -> JoinHandle<()>
    where
        F: FnOnce(Option<Envelope>) + Send + 'static,
    {
        tokio::spawn(self.callback(continuation))
    }

    /// Perform the lookup and return the envelope, if any.
    pub async fn envelope(self) -> Option<Envelope> {
        match self.transport.get(&self.request).await {
            Ok(body) => {
                let extraction = extract_envelope(&body, self.severity);
                extraction.log(&self.pid);
                extraction.into_envelope()
            }
            Err(e) => {
                tracing::error!(
                    module = MODULE_NAME,
                    pid = %self.pid.as_str(),
                    error = %e,
                    "envelope request failed"
                );
                None
            }
        }
    }
}

impl IdCallback for PendingResolution {
    fn callback(self: Box<Self>, continuation: Continuation) -> BoxFuture<()> {
        Box::pin(PendingResolution::callback(*self, continuation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acrossid_core::geometry::{Extent, NullProbe, StaticProbe};
    use acrossid_core::GdprConsent;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every request and answers with a canned body.
    struct RecordingTransport {
        body: Result<String, u16>,
        seen: Mutex<Vec<TransportRequest>>,
    }

    impl RecordingTransport {
        fn answering(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: Ok(body.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                body: Err(status),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<TransportRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn get(&self, request: &TransportRequest) -> Result<String, ResolveError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.body {
                Ok(body) => Ok(body.clone()),
                Err(status) => Err(ResolveError::ApiError {
                    endpoint: request.endpoint(),
                    status: *status,
                    body: String::new(),
                }),
            }
        }
    }

    fn module(transport: Arc<RecordingTransport>) -> AcrossIdModule {
        AcrossIdModule::new(transport, Arc::new(NullProbe))
    }

    #[test]
    fn missing_pid_yields_no_pending_resolution() {
        let transport = RecordingTransport::answering("{}");
        let m = module(transport.clone());
        assert!(m.resolve(&json!({}), &ConsentContext::empty()).is_none());
        assert!(m.resolve(&json!({ "pid": 1 }), &ConsentContext::empty()).is_none());
        assert!(m.get_id(&json!({ "apiUrl": "https://x.test" }), &ConsentContext::empty()).is_none());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn request_carries_credentials_and_default_timeout() {
        let m = module(RecordingTransport::answering("{}"));
        let pending = m.resolve(&json!({ "pid": "p1" }), &ConsentContext::empty()).unwrap();
        let request = pending.request();
        assert!(request.with_credentials);
        assert_eq!(request.timeout, std::time::Duration::from_millis(10_000));
        assert_eq!(request.url.as_str(), crate::config::DEFAULT_API_URL);
        assert_eq!(request.params.get("pid"), Some("p1"));
        assert_eq!(request.params.get("gdpr"), Some("0"));
    }

    #[test]
    fn api_url_and_timeout_overrides_are_used() {
        let m = module(RecordingTransport::answering("{}"));
        let pending = m
            .resolve(
                &json!({ "pid": "p1", "apiUrl": "https://staging.test/v1/envelope", "timeoutMs": 250 }),
                &ConsentContext::empty(),
            )
            .unwrap();
        assert_eq!(pending.request().url.as_str(), "https://staging.test/v1/envelope");
        assert_eq!(pending.request().timeout, std::time::Duration::from_millis(250));
        assert!(pending.request().with_credentials);
    }

    #[test]
    fn geometry_is_sampled_from_probe() {
        let probe = StaticProbe {
            viewport: Extent::new(1024, 768),
            screen: Extent::new(0, 1080),
            device_pixel_ratio: None,
        };
        let m = AcrossIdModule::new(RecordingTransport::answering("{}"), Arc::new(probe));
        let pending = m.resolve(&json!({ "pid": "p1" }), &ConsentContext::empty()).unwrap();
        let params = &pending.request().params;
        assert_eq!(params.get("vw"), Some("1024"));
        assert_eq!(params.get("vh"), Some("768"));
        assert!(!params.contains("sw"));
        assert_eq!(params.get("sh"), Some("1080"));
    }

    #[test]
    fn consent_is_forwarded() {
        let consent = ConsentContext {
            gdpr: Some(GdprConsent {
                gdpr_applies: true,
                consent_string: Some("CS".into()),
            }),
            us_privacy: Some("1YNN".into()),
            ..Default::default()
        };
        let m = module(RecordingTransport::answering("{}"));
        let pending = m.resolve(&json!({ "pid": "p1" }), &consent).unwrap();
        let params = &pending.request().params;
        assert_eq!(params.get("gdpr"), Some("1"));
        assert_eq!(params.get("gdpr_consent"), Some("CS"));
        assert_eq!(params.get("us_privacy"), Some("1YNN"));
    }

    #[tokio::test]
    async fn callback_delivers_envelope_once() {
        let transport = RecordingTransport::answering(r#"{"succeeded":true,"data":{"envelope":"E1"}}"#);
        let m = module(transport.clone());
        let pending = m.resolve(&json!({ "pid": "p1" }), &ConsentContext::empty()).unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        pending.callback(move |env| sink.lock().unwrap().push(env)).await;

        assert_eq!(*calls.lock().unwrap(), vec![Some(Envelope::new("E1"))]);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_delivers_none_once() {
        let m = module(RecordingTransport::failing(503));
        let pending = m.resolve(&json!({ "pid": "p1" }), &ConsentContext::empty()).unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        pending.callback(move |env| sink.lock().unwrap().push(env)).await;

        assert_eq!(*calls.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn unparsable_body_delivers_none_once() {
        let m = module(RecordingTransport::answering("<html>oops</html>"));
        let pending = m.resolve(&json!({ "pid": "p1" }), &ConsentContext::empty()).unwrap();

        let calls = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&calls);
        pending
            .callback(move |env| {
                assert!(env.is_none());
                *sink.lock().unwrap() += 1;
            })
            .await;

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn host_descriptor_runs_through_boxed_callback() {
        let m = module(RecordingTransport::answering(r#"{"succeeded":true,"data":{"envelope":"E2"}}"#));
        assert_eq!(m.name(), "33acrossId");
        assert_eq!(m.gvlid(), Some(58));

        let handle = m.get_id(&json!({ "pid": "p1" }), &ConsentContext::empty()).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        handle
            .callback(Box::new(move |env| {
                let _ = tx.send(env);
            }))
            .await;
        assert_eq!(rx.await.unwrap(), Some(Envelope::new("E2")));
    }

    #[tokio::test]
    async fn spawn_runs_on_runtime() {
        let m = module(RecordingTransport::answering(r#"{"succeeded":false,"error":"Cookied User"}"#));
        let pending = m.resolve(&json!({ "pid": "p1" }), &ConsentContext::empty()).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        pending
            .spawn(move |env| {
                let _ = tx.send(env);
            })
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), None);
    }

    #[test]
    fn decode_and_eids_match_descriptor() {
        let m = module(RecordingTransport::answering("{}"));
        let decoded = m.decode("E1");
        assert_eq!(decoded.to_json(), json!({ "33acrossId": { "envelope": "E1" } }));
        let eids = m.eids();
        assert_eq!(eids.len(), 1);
        assert_eq!(eids[0].source, "33across.com");
        assert_eq!(eids[0].atype, 1);
    }
}
