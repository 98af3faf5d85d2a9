//! Derivation of effective name, organization and cluster size.
//!
//! Pure functions, no I/O. Fallback chains are ordered lists of sources
//! where the first non-empty value wins.

use std::fmt;

use crate::config::{Environment, NameScope};
use crate::error::{ReconcileError, Result};
use crate::model::{Arch, DatabaseSpec, DatabaseStatus, EngineKind};

/// Longest physical name we generate.
const MAX_NAME_LEN: usize = 64;

const TIERS: &[&str] = &[
    "PS_DEV", "PS_5", "PS_10", "PS_20", "PS_40", "PS_80", "PS_160", "PS_320", "PS_400", "PS_640",
    "PS_700", "PS_900", "PS_1280", "PS_1400", "PS_1800", "PS_2100", "PS_2560", "PS_2700",
    "PS_2800",
];

/// Tiers without an ARM offering.
const X86_ONLY_TIERS: &[&str] = &["PS_DEV", "PS_5"];

/// Tiers without a postgresql offering.
const MYSQL_ONLY_TIERS: &[&str] = &["PS_DEV"];

/// First present, non-blank value.
pub fn first_present<I>(sources: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    sources
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

/// Effective physical name: spec, then prior record, then generated.
///
/// An existing name is never changed here; a differing spec name becomes
/// an explicit rename in the update path.
pub fn resolve_name(
    id: &str,
    spec: &DatabaseSpec,
    prior: Option<&DatabaseStatus>,
    fallback: impl FnOnce(&str) -> String,
) -> String {
    first_present([spec.name.clone(), prior.map(|p| p.name.clone())])
        .unwrap_or_else(|| fallback(id))
}

/// Effective organization: prior record, then spec, then environment.
///
/// The prior record wins so that a delete still targets the organization
/// the database was created in after defaults change.
pub fn resolve_organization(
    id: &str,
    spec: &DatabaseSpec,
    prior: Option<&DatabaseStatus>,
    env: &Environment,
) -> Result<String> {
    first_present([
        prior.map(|p| p.organization.clone()),
        spec.organization.clone(),
        env.organization.clone(),
    ])
    .ok_or_else(|| {
        ReconcileError::Configuration(format!(
            "no organization for database {id}: set `organization` or {}",
            crate::config::ORGANIZATION_ENV
        ))
    })
}

/// Deterministic physical name `{app}-{id}-{stage}`, restricted to
/// lowercase alphanumerics and single dashes.
pub fn physical_name(scope: &NameScope, id: &str) -> String {
    let raw = format!("{}-{}-{}", scope.app, id, scope.stage).to_ascii_lowercase();
    let mut name = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '-' };
        if c == '-' && (name.is_empty() || name.ends_with('-')) {
            continue;
        }
        name.push(c);
    }
    name.truncate(MAX_NAME_LEN);
    name.trim_end_matches('-').to_string()
}

/// Cloud provider hosting a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Aws,
    Gcp,
}

impl Provider {
    pub fn for_region(region: Option<&str>) -> Self {
        match region {
            Some(slug) if slug.starts_with("gcp-") => Provider::Gcp,
            _ => Provider::Aws,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Gcp => "GCP",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Parsed cluster size token.
struct SizeToken {
    tier: String,
    qualifier: Option<(Provider, Arch)>,
}

fn parse_size(size: &str) -> Result<SizeToken> {
    let token = size.trim().to_ascii_uppercase().replace('-', "_");
    let parts: Vec<&str> = token.split('_').collect();

    let (tier, qualifier) = match parts.as_slice() {
        [prefix, tier] => (format!("{prefix}_{tier}"), None),
        [prefix, tier, provider, arch] => {
            let provider = match *provider {
                "AWS" => Provider::Aws,
                "GCP" => Provider::Gcp,
                _ => return Err(invalid_size(size)),
            };
            let arch = match *arch {
                "X86" => Arch::X86,
                "ARM" => Arch::Arm,
                _ => return Err(invalid_size(size)),
            };
            (format!("{prefix}_{tier}"), Some((provider, arch)))
        }
        _ => return Err(invalid_size(size)),
    };

    if !TIERS.contains(&tier.as_str()) {
        return Err(invalid_size(size));
    }
    Ok(SizeToken { tier, qualifier })
}

fn invalid_size(size: &str) -> ReconcileError {
    ReconcileError::Configuration(format!("unknown cluster size `{size}`"))
}

/// Canonical cluster size for an engine, architecture and region.
///
/// mysql sizes are bare tiers (`PS_10`). postgresql sizes are qualified
/// with provider and architecture (`PS_10_AWS_X86`); a pre-qualified token
/// is accepted when it agrees with `arch` and `region`.
pub fn normalize_cluster_size(
    size: &str,
    kind: EngineKind,
    arch: Option<Arch>,
    region: Option<&str>,
) -> Result<String> {
    let parsed = parse_size(size)?;

    match kind {
        EngineKind::Mysql => {
            if parsed.qualifier.is_some() {
                return Err(ReconcileError::Configuration(format!(
                    "cluster size `{size}` is architecture-specific and only valid for postgresql"
                )));
            }
            if let Some(arch) = arch {
                return Err(ReconcileError::Configuration(format!(
                    "architecture `{}` is only supported for postgresql databases",
                    arch.as_str()
                )));
            }
            Ok(parsed.tier)
        }
        EngineKind::Postgresql => {
            if MYSQL_ONLY_TIERS.contains(&parsed.tier.as_str()) {
                return Err(ReconcileError::Configuration(format!(
                    "cluster size `{}` is not available for postgresql",
                    parsed.tier
                )));
            }

            let region_provider = Provider::for_region(region);
            let (provider, arch) = match parsed.qualifier {
                None => (region_provider, arch.unwrap_or_default()),
                Some((provider, token_arch)) => {
                    if let Some(arch) = arch.filter(|a| *a != token_arch) {
                        return Err(ReconcileError::Configuration(format!(
                            "cluster size `{size}` conflicts with architecture `{}`",
                            arch.as_str()
                        )));
                    }
                    if let Some(region) = region.filter(|_| provider != region_provider) {
                        return Err(ReconcileError::Configuration(format!(
                            "cluster size `{size}` targets {provider} but region `{region}` is hosted on {region_provider}"
                        )));
                    }
                    (provider, token_arch)
                }
            };

            if arch == Arch::Arm && provider == Provider::Gcp {
                return Err(ReconcileError::Configuration(format!(
                    "arm cluster sizes are not available in GCP region `{}`",
                    region.unwrap_or("unknown")
                )));
            }
            if arch == Arch::Arm && X86_ONLY_TIERS.contains(&parsed.tier.as_str()) {
                return Err(ReconcileError::Configuration(format!(
                    "cluster size `{}` is not available with arm",
                    parsed.tier
                )));
            }

            Ok(format!("{}_{}_{}", parsed.tier, provider, arch.token()))
        }
    }
}
