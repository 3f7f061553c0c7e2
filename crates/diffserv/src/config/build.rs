//! Conversion of configuration elements into conditioner components.

use std::net::IpAddr;
use std::str::FromStr;

use super::ConfigContext;
use super::types::*;
use crate::action::{ActionRule, ColorSet, DscpSet, MarkTarget};
use crate::classifier::{Classifier, ClassifierKind, Filter, MultiFieldClassifier};
use crate::conditioner::TrafficConditioner;
use crate::error::{Error, Result};
use crate::meter::{MeterKind, MeterParams, SrTcmParams, TokenBucketParams, TrTcmParams};
use crate::shaper::ShaperSpec;
use crate::types::{Color, Dscp, dscp};
use crate::util::rate::InformationRate;
use crate::util::{addr, names, parse};
use crate::validation;

/// Parse an attribute with `f`, naming the element and attribute on failure.
fn attr<T, E: std::fmt::Display>(
    element: &str,
    attribute: &str,
    value: &AttrValue,
    f: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> Result<T> {
    f(value.as_text().trim()).map_err(|e| Error::config(element, attribute, e))
}

fn is_wildcard(value: Option<&AttrValue>) -> bool {
    value.is_none_or(|v| v.as_text().trim() == "*")
}

fn parse_protocol(s: &str) -> std::result::Result<u8, parse::ParseError> {
    match names::protocol_id(s) {
        Some(id) => Ok(id),
        None if s.starts_with(|c: char| c.is_ascii_digit()) => parse::get_u8(s),
        None => Err(parse::ParseError::UnknownName(s.to_string())),
    }
}

// ============================================================================
// Classifier
// ============================================================================

impl ClassifierConfig {
    /// Build the classifier.
    pub fn to_classifier(&self) -> Result<Classifier> {
        let kind = match &self.kind {
            Some(name) => ClassifierKind::from_str(name)
                .map_err(|e| e.in_element("classifier"))?,
            None => ClassifierKind::default(),
        };

        match kind {
            ClassifierKind::BehaviorAggregate => {
                if !self.filters.is_empty() {
                    tracing::warn!(
                        filters = self.filters.len(),
                        "behavior-aggregate classifier ignores its filters"
                    );
                }
                Ok(Classifier::BehaviorAggregate)
            }
            ClassifierKind::MultiField => {
                let mut mf = MultiFieldClassifier::new();
                for (i, config) in self.filters.iter().enumerate() {
                    let element = format!("classifier.filters[{}]", i);
                    let filter = config.to_filter(&element)?;
                    mf.push(filter).map_err(|e| e.in_element(&element))?;
                }
                let result = validation::Validatable::validate(&mf);
                result.log_warnings("classifier");
                Ok(Classifier::MultiField(mf))
            }
        }
    }
}

impl FilterConfig {
    /// Build one filter. Range checks happen when it joins a classifier.
    pub fn to_filter(&self, element: &str) -> Result<Filter> {
        let dscp_value = self
            .dscp
            .as_ref()
            .ok_or_else(|| Error::missing(element, "dscp"))?;
        let mut filter = Filter::new(attr(element, "dscp", dscp_value, Dscp::from_str)?);

        if let Some(value) = &self.src_address {
            let len = self.src_prefix_length.as_ref();
            let (address, len) = address(element, ("srcAddress", value), ("srcPrefixLength", len))?;
            filter = filter.src(address, len);
        }
        if let Some(value) = &self.dest_address {
            let len = self.dest_prefix_length.as_ref();
            let (address, len) = address(element, ("destAddress", value), ("destPrefixLength", len))?;
            filter = filter.dst(address, len);
        }
        if let Some(value) = &self.protocol {
            filter = filter.protocol(attr(element, "protocol", value, parse_protocol)?);
        }
        if let Some(value) = &self.tos {
            filter.tos = attr(element, "tos", value, parse::get_u8)?;
        }
        if let Some(value) = &self.tos_mask {
            filter.tos_mask = attr(element, "tosMask", value, parse::get_u8)?;
        }
        if let Some(value) = &self.src_port {
            filter.src_ports = Some(attr(element, "srcPort", value, parse::get_port_range)?);
        }
        if let Some(value) = &self.dest_port {
            filter.dst_ports = Some(attr(element, "destPort", value, parse::get_port_range)?);
        }

        Ok(filter)
    }
}

/// Resolve an address attribute and its prefix length. An explicit prefix
/// length attribute wins over CIDR notation; the default is the host length
/// of the family.
fn address(
    element: &str,
    (attribute, value): (&str, &AttrValue),
    (len_attribute, len): (&str, Option<&AttrValue>),
) -> Result<(IpAddr, u8)> {
    let (address, cidr_len) = attr(element, attribute, value, addr::parse_prefix)?;
    let len = match len {
        Some(len) => attr(element, len_attribute, len, parse::get_u8)?,
        None => cidr_len.unwrap_or_else(|| addr::max_prefix_len(&address)),
    };
    Ok((address, len))
}

// ============================================================================
// Meters
// ============================================================================

impl MeterConfig {
    /// Resolve the meter name and parameters.
    pub fn to_params(&self, element: &str, datarate: Option<f64>) -> Result<(String, MeterParams)> {
        let name = self
            .name
            .clone()
            .ok_or_else(|| Error::missing(element, "name"))?;
        let element = format!("{} '{}'", element, name);
        let kind = self
            .kind
            .as_deref()
            .ok_or_else(|| Error::missing(&element, "type"))?;
        let kind = MeterKind::from_str(kind).map_err(|e| e.in_element(&element))?;

        let rate = |attribute: &str, value: &Option<AttrValue>| -> Result<f64> {
            let Some(value) = value else {
                return Ok(0.0);
            };
            let rate = attr(&element, attribute, value, parse::get_rate)?;
            if let InformationRate::Relative(fraction) = rate {
                validation::validate_percentage(fraction * 100.0, attribute)
                    .into_result()
                    .map_err(|e| e.in_element(&element))?;
            }
            rate.resolve(datarate).ok_or_else(|| {
                Error::config(
                    &element,
                    attribute,
                    "percentage rate needs the interface datarate",
                )
            })
        };
        let burst = |attribute: &str, value: &Option<AttrValue>| -> Result<u64> {
            match value {
                Some(value) => attr(&element, attribute, value, parse::get_bucket_size),
                None => Ok(0),
            }
        };

        let params = match kind {
            MeterKind::TokenBucket => MeterParams::TokenBucket(TokenBucketParams {
                cir: rate("cir", &self.cir)?,
                cbs: burst("cbs", &self.cbs)?,
            }),
            MeterKind::SrTcm => MeterParams::SrTcm(SrTcmParams {
                cir: rate("cir", &self.cir)?,
                cbs: burst("cbs", &self.cbs)?,
                ebs: burst("ebs", &self.ebs)?,
            }),
            MeterKind::TrTcm => MeterParams::TrTcm(TrTcmParams {
                pir: rate("pir", &self.pir)?,
                pbs: burst("pbs", &self.pbs)?,
                cir: rate("cir", &self.cir)?,
                cbs: burst("cbs", &self.cbs)?,
            }),
        };

        Ok((name, params))
    }
}

impl TrafficProfileConfig {
    /// Resolve the selected code points and the meter name.
    pub fn to_profile(&self, element: &str) -> Result<(DscpSet, String)> {
        let meter = self
            .meter
            .clone()
            .ok_or_else(|| Error::missing(element, "meter"))?;
        Ok((dscp_set(element, self.dscp.as_ref())?, meter))
    }
}

// ============================================================================
// Actions
// ============================================================================

fn dscp_set(element: &str, value: Option<&AttrValue>) -> Result<DscpSet> {
    match value {
        _ if is_wildcard(value) => Ok(DscpSet::All),
        Some(value) => attr(element, "dscp", value, dscp::parse_dscp_list).map(DscpSet::List),
        None => Ok(DscpSet::All),
    }
}

fn color_set(element: &str, value: Option<&AttrValue>) -> Result<ColorSet> {
    match value {
        _ if is_wildcard(value) => Ok(ColorSet::All),
        Some(value) => attr(element, "color", value, |s| {
            s.split_whitespace()
                .map(Color::from_str)
                .collect::<std::result::Result<Vec<_>, _>>()
        })
        .map(ColorSet::List),
        None => Ok(ColorSet::All),
    }
}

impl ActionConfig {
    /// Build the action rule.
    pub fn to_rule(&self, element: &str) -> Result<ActionRule> {
        match self {
            Self::Drop(c) => Ok(ActionRule::drop(
                dscp_set(element, c.dscp.as_ref())?,
                color_set(element, c.color.as_ref())?,
            )),
            Self::Mark(c) => {
                let value = c
                    .value
                    .as_ref()
                    .ok_or_else(|| Error::missing(element, "value"))?;
                let target = if value.as_text().trim() == "*" {
                    MarkTarget::Matched
                } else {
                    MarkTarget::Dscp(attr(element, "value", value, Dscp::from_str)?)
                };
                Ok(ActionRule::mark(
                    dscp_set(element, c.dscp.as_ref())?,
                    color_set(element, c.color.as_ref())?,
                    target,
                ))
            }
            Self::Shape(c) => {
                let kind = c
                    .kind
                    .clone()
                    .ok_or_else(|| Error::missing(element, "type"))?;
                let mut spec = ShaperSpec::new(kind);
                for (key, value) in &c.params {
                    spec = spec.param(key.as_str(), value.as_text());
                }
                Ok(ActionRule::shape(
                    dscp_set(element, c.dscp.as_ref())?,
                    color_set(element, c.color.as_ref())?,
                    spec,
                ))
            }
        }
    }
}

// ============================================================================
// Conditioner
// ============================================================================

impl TrafficConditioner {
    /// Build a conditioner from its configuration.
    ///
    /// Fails with the first error found; the error names the element and,
    /// where there is one, the attribute.
    pub fn from_config(config: &ConditionerConfig, ctx: ConfigContext) -> Result<Self> {
        let mut builder = TrafficConditioner::builder().shaper_factory(ctx.shaper_factory);
        if let Some(clock) = ctx.clock {
            builder = builder.boxed_clock(clock);
        }

        if let Some(classifier) = &config.classifier {
            builder = builder.classifier(classifier.to_classifier()?);
        }

        for (i, meter) in config.meters.iter().enumerate() {
            let (name, params) = meter.to_params(&format!("meters[{}]", i), ctx.datarate)?;
            builder = builder.meter(name, params);
        }

        for (i, profile) in config.traffic_profiles.iter().enumerate() {
            let (dscps, meter) = profile.to_profile(&format!("traffic-profiles[{}]", i))?;
            builder = builder.traffic_profile(dscps, meter);
        }

        if let Some(actions) = &config.actions {
            let mut rules = Vec::with_capacity(actions.len());
            for (i, action) in actions.iter().enumerate() {
                rules.push(action.to_rule(&format!("actions[{}] <{}>", i, action.name()))?);
            }
            builder = builder.actions(rules);
        }

        builder.build()
    }
}
