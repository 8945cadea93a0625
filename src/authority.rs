//! Hickory DNS authority backed by the lease resolver.

use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::{A, PTR};
use hickory_proto::rr::{DNSClass, LowerName, Name, RData, Record, RecordSet, RecordType};
use hickory_server::authority::{
    Authority, LookupControlFlow, LookupError, LookupOptions, LookupRecords, MessageRequest,
    UpdateResult, ZoneType,
};
use hickory_server::server::RequestInfo;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use crate::metrics::{self, QueryResult, Timer};
use crate::resolver::{LeaseAnswer, LeaseResolver};

/// Authority answering A and PTR queries from the lease table.
///
/// One instance serves the forward zone (the configured authority domain,
/// or the root for catch-all deployments) and a second serves
/// `in-addr.arpa`; both share the same resolver and store handle.
pub struct LeaseAuthority {
    origin: LowerName,
    resolver: LeaseResolver,
}

impl LeaseAuthority {
    /// Create an authority rooted at `origin`. `None` means the root
    /// zone, answering for all names.
    pub fn new(
        origin: Option<&str>,
        resolver: LeaseResolver,
    ) -> Result<Self, hickory_proto::ProtoError> {
        let origin = match origin {
            Some(domain) => Name::from_ascii(domain)?.into(),
            None => LowerName::from(Name::root()),
        };

        Ok(Self { origin, resolver })
    }

    /// Convert resolved answers into a record set under the question name.
    fn build_record_set(
        &self,
        name: Name,
        rtype: RecordType,
        answers: Vec<LeaseAnswer>,
    ) -> RecordSet {
        let mut record_set = RecordSet::new(name.clone(), rtype, 0);

        for answer in answers {
            let (ttl, rdata) = match answer {
                LeaseAnswer::Address { addr, ttl } => (ttl, RData::A(A::from(addr))),
                LeaseAnswer::Pointer { hostname, ttl } => match Name::from_ascii(&hostname) {
                    Ok(target) => (ttl, RData::PTR(PTR(target))),
                    Err(e) => {
                        warn!(hostname = %hostname, error = %e, "lease hostname is not a valid DNS name, skipping row");
                        continue;
                    }
                },
            };

            let mut record = Record::from_rdata(name.clone(), ttl, rdata);
            record.set_dns_class(DNSClass::IN);
            record_set.insert(record, 0);
        }

        record_set
    }
}

#[async_trait]
impl Authority for LeaseAuthority {
    type Lookup = LookupRecords;

    fn zone_type(&self) -> ZoneType {
        ZoneType::Primary
    }

    fn is_axfr_allowed(&self) -> bool {
        false
    }

    fn origin(&self) -> &LowerName {
        &self.origin
    }

    async fn lookup(
        &self,
        name: &LowerName,
        rtype: RecordType,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        let timer = Timer::start();
        let rtype_str = format!("{:?}", rtype);
        let name_str = name.to_string();

        trace!(name = %name_str, rtype = ?rtype, "DNS lookup");

        let answers = match self.resolver.resolve(rtype, &name_str).await {
            Ok(answers) => answers,
            Err(e) => {
                // A failed lease lookup answers this query with SERVFAIL;
                // the server stays up.
                error!(name = %name_str, rtype = ?rtype, error = %e, "lease lookup failed");
                metrics::record_query(&rtype_str, QueryResult::Error, timer.elapsed());
                return LookupControlFlow::Break(Err(LookupError::from(io::Error::new(
                    io::ErrorKind::Other,
                    format!("lease lookup failed: {e}"),
                ))));
            }
        };

        if answers.is_empty() {
            return if matches!(rtype, RecordType::A | RecordType::PTR) {
                debug!(name = %name_str, rtype = ?rtype, "no active lease");
                metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NXDomain)))
            } else {
                metrics::record_query(&rtype_str, QueryResult::Unsupported, timer.elapsed());
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
            };
        }

        debug!(name = %name_str, rtype = ?rtype, count = answers.len(), "returning lease records");
        metrics::record_answers_returned(answers.len());
        metrics::record_query(&rtype_str, QueryResult::Success, timer.elapsed());
        let record_set = Arc::new(self.build_record_set(Name::from(name.clone()), rtype, answers));
        LookupControlFlow::Break(Ok(LookupRecords::new(lookup_options, record_set)))
    }

    async fn search(
        &self,
        request_info: RequestInfo<'_>,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        self.lookup(
            request_info.query.name(),
            request_info.query.query_type(),
            lookup_options,
        )
        .await
    }

    async fn get_nsec_records(
        &self,
        _name: &LowerName,
        _lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        // DNSSEC not supported
        LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
    }

    async fn update(&self, _update: &MessageRequest) -> UpdateResult<bool> {
        // Dynamic updates not supported
        Err(ResponseCode::NotImp)
    }
}
