use crate::types::{CountyRecord, GeoFeature};
use tracing::{debug, warn};

/// Copy each record's attribute values onto every feature with the same key.
///
/// Features with no matching record keep `attributes == None`. The scan is
/// records x features, which is fine at county granularity and nothing larger.
pub fn join_attributes(records: &[CountyRecord], features: &mut [GeoFeature]) {
    let mut matched = 0;
    for record in records {
        for feature in features.iter_mut() {
            if feature.geoid == record.geoid {
                feature.attributes = Some(record.values.clone());
                matched += 1;
            }
        }
    }

    debug!("Joined {} of {} features", matched, features.len());
    for feature in features.iter().filter(|f| f.attributes.is_none()) {
        warn!("No CSV record for feature {:?}", feature.geoid);
    }
}
