//! Multi-field classifier.

use crate::error::Result;
use crate::packet::{HeaderView, Packet};
use crate::types::Dscp;
use crate::validation::{Validatable, ValidationResult};

use super::filter::Filter;

/// Ordered list of [`Filter`]s; the first one that matches decides.
///
/// Packets that match no filter, and non-IP packets, are best effort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiFieldClassifier {
    filters: Vec<Filter>,
}

impl MultiFieldClassifier {
    /// Create a classifier with no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter after validating it.
    pub fn push(&mut self, filter: Filter) -> Result<()> {
        filter.validate().into_result()?;
        self.filters.push(filter);
        Ok(())
    }

    /// Append a filter (builder style).
    pub fn filter(mut self, filter: Filter) -> Result<Self> {
        self.push(filter)?;
        Ok(self)
    }

    /// Get the filters in evaluation order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if there are no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Index of the first filter matching `header`.
    pub fn matching_filter(&self, header: &HeaderView) -> Option<usize> {
        self.filters.iter().position(|f| f.matches(header))
    }

    /// Classify a resolved header.
    pub fn classify_header(&self, header: &HeaderView) -> Dscp {
        self.matching_filter(header)
            .map(|i| self.filters[i].dscp)
            .unwrap_or(Dscp::BE)
    }

    /// Classify a packet.
    pub fn classify(&self, packet: &Packet) -> Dscp {
        match packet.header() {
            Some(header) => self.classify_header(&header),
            None => Dscp::BE,
        }
    }
}

impl Validatable for MultiFieldClassifier {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (i, filter) in self.filters.iter().enumerate() {
            let filter_result = filter.validate();
            for issue in filter_result.all_issues() {
                let field = format!("filters[{}].{}", i, issue.field);
                if issue.is_error() {
                    result.add_error(field, issue.message.clone());
                } else {
                    result.add_warning(field, issue.message.clone());
                }
            }
        }

        if let Some(i) = self.filters.iter().position(Filter::is_wildcard)
            && i + 1 < self.filters.len()
        {
            result.add_warning(
                format!("filters[{}]", i),
                format!(
                    "filter matches every packet; {} later filter(s) are unreachable",
                    self.filters.len() - i - 1
                ),
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::IpDatagram;
    use std::net::{IpAddr, Ipv4Addr};

    fn packet(dst_port: u16) -> Packet {
        IpDatagram::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
            .udp(40000, dst_port)
            .length(200)
            .into()
    }

    #[test]
    fn test_first_match_wins() {
        let classifier = MultiFieldClassifier::new()
            .filter(Filter::new(Dscp::EF).udp().dst_port(5060))
            .unwrap()
            .filter(Filter::new(Dscp::AF41).udp())
            .unwrap();

        assert_eq!(classifier.classify(&packet(5060)), Dscp::EF);
        assert_eq!(classifier.classify(&packet(80)), Dscp::AF41);
    }

    #[test]
    fn test_order_is_significant() {
        let classifier = MultiFieldClassifier::new()
            .filter(Filter::new(Dscp::AF41).udp())
            .unwrap()
            .filter(Filter::new(Dscp::EF).udp().dst_port(5060))
            .unwrap();

        assert_eq!(classifier.classify(&packet(5060)), Dscp::AF41);
        assert!(classifier.validate().is_valid());
    }

    #[test]
    fn test_no_match_is_best_effort() {
        let classifier = MultiFieldClassifier::new()
            .filter(Filter::new(Dscp::EF).src(IpAddr::V4(Ipv4Addr::new(172, 16, 0, 0)), 12))
            .unwrap();
        assert_eq!(classifier.classify(&packet(1)), Dscp::BE);
        assert_eq!(classifier.classify(&Packet::Other { byte_length: 60 }), Dscp::BE);
    }

    #[test]
    fn test_push_rejects_invalid_filter() {
        let mut classifier = MultiFieldClassifier::new();
        let err = classifier
            .push(Filter::new(Dscp::EF).src_port_range(9, 1))
            .unwrap_err();
        assert!(err.to_string().contains("srcPort"));
        assert!(classifier.is_empty());
    }

    #[test]
    fn test_unreachable_filters_warning() {
        let classifier = MultiFieldClassifier::new()
            .filter(Filter::new(Dscp::BE))
            .unwrap()
            .filter(Filter::new(Dscp::EF).udp())
            .unwrap();
        let result = classifier.validate();
        assert!(result.is_valid());
        assert_eq!(result.warnings[0].field, "filters[0]");
    }
}
