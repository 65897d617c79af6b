//! # Resolve Subcommand
//!
//! Runs one envelope lookup. Configuration comes from `ACROSSID_*`
//! environment variables with flags taking precedence; consent comes from an
//! optional JSON file with flags taking precedence.

use std::path::PathBuf;
use std::sync::Arc;

use acrossid_client::{AcrossIdModule, FailureSeverity, ResolverConfig};
use acrossid_core::geometry::{Extent, StaticProbe};
use acrossid_core::{
    build_query_params, ConsentContext, ConsentStringPolicy, GdprConsent, GeometryPolicy,
    GeometrySnapshot, GppConsent, IdSubmodule,
};
use anyhow::Context;
use clap::{Args, ValueEnum};

/// Exit code when the lookup completed but produced no envelope.
pub const EXIT_NO_ENVELOPE: u8 = 2;

/// Arguments for the resolve subcommand.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Partner id (default: $ACROSSID_PID).
    #[arg(long)]
    pub pid: Option<String>,

    /// Envelope endpoint (default: $ACROSSID_API_URL or the production endpoint).
    #[arg(long)]
    pub api_url: Option<url::Url>,

    /// Request timeout in milliseconds (default: $ACROSSID_TIMEOUT_MS or 10000).
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// JSON file holding a consent snapshot.
    #[arg(long)]
    pub consent_file: Option<PathBuf>,

    /// GDPR applies to this user.
    #[arg(long)]
    pub gdpr_applies: bool,

    /// TCF consent string.
    #[arg(long)]
    pub gdpr_consent: Option<String>,

    /// US privacy string, e.g. 1YNN.
    #[arg(long)]
    pub us_privacy: Option<String>,

    /// Child-directed treatment flag.
    #[arg(long)]
    pub coppa: Option<bool>,

    /// GPP consent string.
    #[arg(long)]
    pub gpp: Option<String>,

    /// GPP applicable section ids, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub gpp_sid: Vec<u32>,

    /// Viewport size as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_extent)]
    pub viewport: Option<Extent>,

    /// Screen size as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_extent)]
    pub screen: Option<Extent>,

    #[arg(long, value_enum, default_value_t = ConsentStringArg::Gated)]
    pub consent_string_policy: ConsentStringArg,

    #[arg(long, value_enum, default_value_t = GeometryArg::Detailed)]
    pub geometry_policy: GeometryArg,

    #[arg(long, value_enum, default_value_t = SeverityArg::Classified)]
    pub failure_severity: SeverityArg,

    /// Print the query parameters instead of sending the request.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConsentStringArg {
    Gated,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GeometryArg {
    Detailed,
    Combined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    Classified,
    ErrorOnly,
}

impl From<ConsentStringArg> for ConsentStringPolicy {
    fn from(arg: ConsentStringArg) -> Self {
        match arg {
            ConsentStringArg::Gated => Self::GatedOnGdprApplies,
            ConsentStringArg::Always => Self::Always,
        }
    }
}

impl From<GeometryArg> for GeometryPolicy {
    fn from(arg: GeometryArg) -> Self {
        match arg {
            GeometryArg::Detailed => Self::Detailed,
            GeometryArg::Combined => Self::Combined,
        }
    }
}

impl From<SeverityArg> for FailureSeverity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Classified => Self::Classified,
            SeverityArg::ErrorOnly => Self::ErrorOnly,
        }
    }
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_extent(raw: &str) -> Result<Extent, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {raw:?}"))?;
    let width = w.trim().parse::<u32>().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height = h.trim().parse::<u32>().map_err(|e| format!("bad height {h:?}: {e}"))?;
    Ok(Extent::new(width, height))
}

pub fn build_config(args: &ResolveArgs) -> anyhow::Result<ResolverConfig> {
    let mut config = match &args.pid {
        Some(pid) => ResolverConfig::new(pid.clone())?,
        None => ResolverConfig::from_env().context("no --pid given and ACROSSID_PID not usable")?,
    };
    if let Some(url) = &args.api_url {
        config = config.with_api_url(url.clone());
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_timeout_ms(ms);
    }
    config.consent_string_policy = args.consent_string_policy.into();
    config.geometry_policy = args.geometry_policy.into();
    config.failure_severity = args.failure_severity.into();
    Ok(config)
}

pub fn build_consent(args: &ResolveArgs) -> anyhow::Result<ConsentContext> {
    let mut consent = match &args.consent_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading consent file {}", path.display()))?;
            serde_json::from_str::<ConsentContext>(&raw)
                .with_context(|| format!("parsing consent file {}", path.display()))?
        }
        None => ConsentContext::empty(),
    };

    if args.gdpr_applies || args.gdpr_consent.is_some() {
        let gdpr = consent.gdpr.get_or_insert_with(GdprConsent::default);
        gdpr.gdpr_applies |= args.gdpr_applies;
        if let Some(cs) = &args.gdpr_consent {
            gdpr.consent_string = Some(cs.clone());
        }
    }
    if let Some(us) = &args.us_privacy {
        consent.us_privacy = Some(us.clone());
    }
    if args.coppa.is_some() {
        consent.coppa = args.coppa;
    }
    if args.gpp.is_some() || !args.gpp_sid.is_empty() {
        let gpp = consent.gpp.get_or_insert_with(GppConsent::default);
        if let Some(s) = &args.gpp {
            gpp.gpp_string = Some(s.clone());
        }
        if !args.gpp_sid.is_empty() {
            gpp.applicable_sections = args.gpp_sid.clone();
        }
    }
    Ok(consent)
}

fn probe(args: &ResolveArgs) -> StaticProbe {
    StaticProbe {
        viewport: args.viewport.unwrap_or_default(),
        screen: args.screen.unwrap_or_default(),
        device_pixel_ratio: None,
    }
}

/// Execute the resolve subcommand.
pub fn run_resolve(args: &ResolveArgs) -> anyhow::Result<u8> {
    let config = build_config(args)?;
    let consent = build_consent(args)?;
    let probe = probe(args);

    if args.dry_run {
        let geometry = GeometrySnapshot::sample(&probe);
        let params = build_query_params(&config.pid, &consent, &geometry, config.param_policy());
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(0);
    }

    tracing::info!(pid = %config.pid.as_str(), url = %config.api_url, "resolving envelope");

    let module = AcrossIdModule::with_http(Arc::new(probe))?;
    let pending = module.resolve_with(config, &consent);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let envelope = runtime.block_on(pending.envelope());

    match envelope {
        Some(envelope) => {
            let decoded = module.decode(envelope.as_str());
            println!("{}", serde_json::to_string_pretty(&decoded)?);
            Ok(0)
        }
        None => {
            tracing::warn!("no envelope resolved");
            Ok(EXIT_NO_ENVELOPE)
        }
    }
}
