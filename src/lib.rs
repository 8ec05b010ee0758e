//! Decoder for a self-describing binary document container.
//!
//! A document is a set of numbered zones. Zones of kind `"Cluster"` hold clusters: a prologue
//! followed by sub-records, each made of a typed header understood by a per-family strategy and
//! a run of tagged [`Field`]s. Clusters reference other zones through [`Link`]s, which the
//! [`resolver`] materializes into lists, strings, fixed-stride arrays and nested clusters.
//! Style clusters are finally resolved along their parent chains by [`style::resolve_cascade`].
//!
//! Decoding never gives up on a document. Every recoverable problem is counted in
//! [`Diagnostics`] and the affected unit is skipped; the only hard failure is a cluster zone too
//! short to hold a prologue.
//!
//! ```
//! use cluster_decoder::{ClusterDecoder, DecoderSettings, MemoryZoneStore};
//!
//! let store = MemoryZoneStore::new();
//! let mut decoder =
//!     ClusterDecoder::new(&store).with_configuration(DecoderSettings::new().num_threads(1));
//! assert!(decoder.decode(1).is_err());
//! ```

pub mod cluster;
pub mod cluster_info;
pub mod cluster_reader;
pub mod decoder;
pub mod diagnostics;
pub mod err;
pub mod field;
pub mod link;
pub mod resolver;
mod strategy;
pub mod style;
mod utils;
pub mod varint;
pub mod zone;

pub use cluster::{Cluster, FamilyData, LinkOrigin, NamedLink, StyleKind};
pub use cluster_info::{ClusterInfo, ClusterInfoTable, FamilyType};
pub use cluster_reader::{classify_zone, read_cluster};
pub use decoder::{ClusterDecoder, DecodedCluster, DecoderSettings};
pub use diagnostics::{
    AnomalyKind, CollectingSink, DiagnosticEntry, DiagnosticSink, Diagnostics, NoopSink, TraceSink,
};
pub use err::{DecodeError, DecodeResult};
pub use field::{Field, FieldValue, read_field, read_fields};
pub use link::{Link, LinkType, read_link_header};
pub use resolver::{Entries, Payload, Resolution, resolve_link, resolve_links};
pub use style::StyleSheet;
pub use utils::ZoneCursor;
pub use varint::{encode_varint, read_varint};
pub use zone::{CLUSTER_ZONE_KIND, Endianness, MemoryZoneStore, Zone, ZoneId, ZoneStore};

#[cfg(test)]
pub(crate) mod tests;

#[cfg(test)]
pub(crate) fn ensure_env_logger_initialized() {
    use std::io::Write;
    use std::sync::Once;

    static LOGGER_INIT: Once = Once::new();

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
