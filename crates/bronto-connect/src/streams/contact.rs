//! Contacts, windowed on their `modified` timestamp

use super::{Incremental, StreamStrategy};
use crate::session::{ContactInclusion, DateCondition, DateOperator, Filter, Operation};
use crate::sync::projector::Selection;
use crate::sync::window::TimeWindow;
use crate::traits::record::{FieldValue, Record};
use chrono::Duration;
use tracing::info;

pub const TABLE: &str = "contact";
pub const REPLICATION_KEY: &str = "modified";

/// Nested map the API returns derived fields in
pub const READ_ONLY_DATA_FIELD: &str = "readOnlyContactData";

pub const GEO_IP_FIELDS: &[&str] = &[
    "geoIPCity",
    "geoIPStateRegion",
    "geoIPZip",
    "geoIPCountry",
    "geoIPCountryCode",
];

pub const TECHNOLOGY_FIELDS: &[&str] = &[
    "primaryBrowser",
    "mobileBrowser",
    "primaryEmailClient",
    "mobileEmailClient",
    "operatingSystem",
];

pub const RFM_FIELDS: &[&str] = &[
    "firstOrderDate",
    "lastOrderDate",
    "lastOrderTotal",
    "totalOrders",
    "totalRevenue",
    "averageOrderValue",
];

pub const ENGAGEMENT_FIELDS: &[&str] = &["lastDeliveryDate", "lastOpenDate", "lastClickDate"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ContactStream;

impl StreamStrategy for ContactStream {
    fn table(&self) -> &'static str {
        TABLE
    }

    fn operation(&self) -> Operation {
        Operation::ReadContacts
    }

    fn incremental(&self) -> Option<Incremental> {
        Some(Incremental {
            replication_key: REPLICATION_KEY,
            interval: Duration::hours(6),
        })
    }

    fn filter(&self, window: Option<&TimeWindow>, _page_size: u32) -> Filter {
        let conditions = window
            .map(|w| {
                vec![
                    DateCondition {
                        operator: DateOperator::AfterOrSameDay,
                        value: w.start,
                    },
                    DateCondition {
                        operator: DateOperator::Before,
                        value: w.end,
                    },
                ]
            })
            .unwrap_or_default();
        Filter::ContactModified { conditions }
    }

    fn inclusion(&self, selection: &Selection) -> ContactInclusion {
        let inclusion = ContactInclusion {
            lists: true,
            sms_keywords: true,
            geo_ip: selection.any_selected(GEO_IP_FIELDS),
            technology: selection.any_selected(TECHNOLOGY_FIELDS),
            rfm: selection.any_selected(RFM_FIELDS),
            engagement: selection.any_selected(ENGAGEMENT_FIELDS),
        };

        if inclusion.geo_ip {
            info!("Including GEOIP data.");
        }
        if inclusion.technology {
            info!("Including technology data.");
        }
        if inclusion.rfm {
            info!("Including RFM data.");
        }
        if inclusion.engagement {
            info!("Including engagement data.");
        }
        inclusion
    }

    /// Lift the fields of `readOnlyContactData` to the top level.
    /// Nested values win over top-level fields of the same name.
    fn map_record(&self, mut record: Record) -> Record {
        if let Some(FieldValue::Map(nested)) = record.remove(READ_ONLY_DATA_FIELD) {
            record.extend(nested);
        }
        record
    }
}
