//! Document-level decoding: clusters by id, their links, their child clusters.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use log::{debug, trace};
use serde::Serialize;

use crate::cluster::{Cluster, LinkOrigin, NamedLink};
use crate::cluster_info::ClusterInfoTable;
use crate::cluster_reader::read_cluster;
use crate::diagnostics::{AnomalyKind, Diagnostics};
use crate::err::{DecodeError, DecodeResult};
use crate::resolver::{Payload, Resolution, resolve_links};
use crate::style::StyleSheet;
use crate::utils::bytes::read_u32;
use crate::zone::{CLUSTER_ZONE_KIND, ZoneId, ZoneStore};

#[cfg(feature = "multithreading")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderSettings {
    /// 0 lets rayon pick; 1 decodes on the calling thread.
    num_threads: usize,
    max_field_depth: usize,
    max_cluster_depth: usize,
    resolve_links: bool,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        DecoderSettings {
            num_threads: 0,
            max_field_depth: 16,
            max_cluster_depth: 32,
            resolve_links: true,
        }
    }
}

impl DecoderSettings {
    pub fn new() -> Self {
        DecoderSettings::default()
    }

    /// Sets the number of worker threads used by [`ClusterDecoder::decode_all`].
    /// `0` uses rayon's default; without the `multithreading` feature this is ignored.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = if cfg!(feature = "multithreading") {
            num_threads
        } else {
            1
        };
        self
    }

    /// Nesting limit for field-lists. Deeper lists are kept as opaque blobs.
    pub fn max_field_depth(mut self, depth: usize) -> Self {
        self.max_field_depth = depth;
        self
    }

    /// Nesting limit for clusters reached through other clusters.
    pub fn max_cluster_depth(mut self, depth: usize) -> Self {
        self.max_cluster_depth = depth;
        self
    }

    /// If `false`, clusters are decoded without materializing their links. Only `child_ids`
    /// are followed then.
    pub fn resolve_links(mut self, resolve_links: bool) -> Self {
        self.resolve_links = resolve_links;
        self
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn get_max_field_depth(&self) -> usize {
        self.max_field_depth
    }

    pub fn get_max_cluster_depth(&self) -> usize {
        self.max_cluster_depth
    }

    pub fn should_resolve_links(&self) -> bool {
        self.resolve_links
    }
}

/// A cluster together with everything materialized from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCluster {
    pub cluster: Cluster,
    pub resolution: Resolution,
    pub styles: Option<StyleSheet>,
    /// Clusters this one leads to, in discovery order.
    pub children: Vec<ZoneId>,
}

type ClusterCache = HashMap<ZoneId, Arc<DecodedCluster>>;

/// Decodes clusters out of a [`ZoneStore`] and caches them by zone id.
pub struct ClusterDecoder<S> {
    store: S,
    settings: DecoderSettings,
    info: ClusterInfoTable,
    cache: ClusterCache,
    diag: Diagnostics,
}

impl<S: ZoneStore> ClusterDecoder<S> {
    pub fn new(store: S) -> Self {
        ClusterDecoder {
            store,
            settings: DecoderSettings::default(),
            info: ClusterInfoTable::new(),
            cache: HashMap::new(),
            diag: Diagnostics::new(),
        }
    }

    pub fn with_configuration(mut self, settings: DecoderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_diagnostics(mut self, diag: Diagnostics) -> Self {
        self.diag = diag;
        self
    }

    /// Loads the ClusterInfo table from the main-list zone `id`. Families declared there take
    /// precedence over fingerprinting.
    pub fn with_cluster_info(mut self, id: ZoneId) -> DecodeResult<Self> {
        let zone = self
            .store
            .fetch_zone(id)
            .ok_or(DecodeError::MissingZone { id })?;
        self.info = ClusterInfoTable::from_zone(&zone, &mut self.diag);
        debug!("zone {id}: {} cluster info entries", self.info.len());
        Ok(self)
    }

    pub fn settings(&self) -> &DecoderSettings {
        &self.settings
    }

    pub fn cluster_info(&self) -> &ClusterInfoTable {
        &self.info
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// A previously decoded cluster.
    pub fn get(&self, id: ZoneId) -> Option<Arc<DecodedCluster>> {
        self.cache.get(&id).cloned()
    }

    pub fn decoded_count(&self) -> usize {
        self.cache.len()
    }

    /// Decodes cluster `id` and, transitively, every cluster it leads to.
    ///
    /// Only a failure of `id` itself is returned; failing descendants are recorded in the
    /// diagnostics and left out of the cache.
    pub fn decode(&mut self, id: ZoneId) -> DecodeResult<Arc<DecodedCluster>> {
        let empty = ClusterCache::new();
        let walk = Walk {
            store: &self.store,
            settings: &self.settings,
            info: &self.info,
            shared: &empty,
        };
        walk.decode_tree(id, &mut self.cache, &mut self.diag)
    }

    fn decode_sequential(&mut self, ids: &[ZoneId]) -> Vec<DecodeResult<Arc<DecodedCluster>>> {
        ids.iter().map(|&id| self.decode(id)).collect()
    }
}

impl<S: ZoneStore + Sync> ClusterDecoder<S> {
    /// Decodes independent top-level clusters, in parallel when `num_threads != 1`. Results are
    /// returned in the order of `ids`.
    pub fn decode_all(&mut self, ids: &[ZoneId]) -> Vec<DecodeResult<Arc<DecodedCluster>>> {
        if self.settings.num_threads == 1 || ids.len() < 2 {
            return self.decode_sequential(ids);
        }
        self.decode_parallel(ids)
    }

    #[cfg(feature = "multithreading")]
    fn decode_parallel(&mut self, ids: &[ZoneId]) -> Vec<DecodeResult<Arc<DecodedCluster>>> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.num_threads)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                debug!("failed to build thread pool ({e}), decoding sequentially");
                return self.decode_sequential(ids);
            }
        };

        let walk = Walk {
            store: &self.store,
            settings: &self.settings,
            info: &self.info,
            shared: &self.cache,
        };
        // `Diagnostics` may own a sink that is `Send` but not `Sync`, so workers get theirs
        // up front instead of sharing a reference to the parent.
        let workers: Vec<Diagnostics> = ids.iter().map(|_| self.diag.detached()).collect();

        let outputs: Vec<(DecodeResult<Arc<DecodedCluster>>, ClusterCache, Diagnostics)> =
            pool.install(|| {
                ids.par_iter()
                    .zip(workers)
                    .map(|(&id, mut diag)| {
                        let mut cache = ClusterCache::new();
                        let result = walk.decode_tree(id, &mut cache, &mut diag);
                        (result, cache, diag)
                    })
                    .collect()
            });

        let mut results = Vec::with_capacity(outputs.len());
        for (result, cache, diag) in outputs {
            self.diag.merge(diag);
            for (id, decoded) in cache {
                self.cache.entry(id).or_insert(decoded);
            }
            // Prefer the instance that made it into the shared cache.
            results.push(result.map(|d| match self.cache.get(&d.cluster.id) {
                Some(cached) => Arc::clone(cached),
                None => d,
            }));
        }
        results
    }

    #[cfg(not(feature = "multithreading"))]
    fn decode_parallel(&mut self, ids: &[ZoneId]) -> Vec<DecodeResult<Arc<DecodedCluster>>> {
        self.decode_sequential(ids)
    }
}

/// Read-only view shared by every worker.
struct Walk<'a, S: ?Sized> {
    store: &'a S,
    settings: &'a DecoderSettings,
    info: &'a ClusterInfoTable,
    /// Clusters decoded before this walk started.
    shared: &'a ClusterCache,
}

impl<S: ZoneStore + ?Sized> Walk<'_, S> {
    fn lookup(&self, id: ZoneId, cache: &ClusterCache) -> Option<Arc<DecodedCluster>> {
        cache.get(&id).or_else(|| self.shared.get(&id)).cloned()
    }

    /// Explicit depth-first worklist from `root`. Every cluster is decoded at most once per
    /// cache; a child that is its own ancestor is reported as a cycle and not followed.
    fn decode_tree(
        &self,
        root: ZoneId,
        cache: &mut ClusterCache,
        diag: &mut Diagnostics,
    ) -> DecodeResult<Arc<DecodedCluster>> {
        if let Some(hit) = self.lookup(root, cache) {
            return Ok(hit);
        }

        let decoded = Arc::new(self.decode_one(root, diag)?);
        cache.insert(root, Arc::clone(&decoded));

        let mut parent_of: HashMap<ZoneId, ZoneId> = HashMap::new();
        let mut seen: HashSet<ZoneId> = HashSet::new();
        seen.insert(root);

        let mut stack: Vec<(ZoneId, usize)> = Vec::new();
        push_children(&mut stack, &mut parent_of, &mut seen, &decoded, 1, diag);

        while let Some((id, depth)) = stack.pop() {
            if self.lookup(id, cache).is_some() {
                trace!("zone {id}: already decoded");
                continue;
            }
            if depth > self.settings.max_cluster_depth {
                diag.anomaly(
                    AnomalyKind::UnknownTag,
                    0,
                    "decoder",
                    format_args!(
                        "zone {id}: cluster nesting deeper than {}, not decoded",
                        self.settings.max_cluster_depth
                    ),
                );
                continue;
            }

            match self.decode_one(id, diag) {
                Ok(child) => {
                    let child = Arc::new(child);
                    cache.insert(id, Arc::clone(&child));
                    push_children(&mut stack, &mut parent_of, &mut seen, &child, depth + 1, diag);
                }
                Err(e) => diag.anomaly(
                    e.class(),
                    0,
                    "decoder",
                    format_args!("zone {id}: skipping cluster: {e}"),
                ),
            }
        }

        Ok(decoded)
    }

    fn decode_one(&self, id: ZoneId, diag: &mut Diagnostics) -> DecodeResult<DecodedCluster> {
        let zone = self
            .store
            .fetch_zone(id)
            .ok_or(DecodeError::MissingZone { id })?;
        if !zone.is_cluster() {
            return Err(DecodeError::WrongZoneKind {
                id,
                kind: zone.kind.to_owned(),
                expected: CLUSTER_ZONE_KIND,
            });
        }

        let cluster = read_cluster(
            &zone,
            self.info.family(id),
            self.settings.max_field_depth,
            diag,
        )?;

        let resolution = if self.settings.resolve_links {
            resolve_links(self.store, cluster.all_links(), diag)
        } else {
            Resolution::default()
        };

        let styles = style_sheet(&cluster, &resolution, self.settings.max_field_depth, diag);
        let children = child_clusters(&cluster, &resolution);
        trace!(
            "zone {id}: {} link(s) resolved, {} skipped, {} child cluster(s)",
            resolution.resolved.len(),
            resolution.skipped.len(),
            children.len()
        );

        Ok(DecodedCluster {
            cluster,
            resolution,
            styles,
            children,
        })
    }
}

fn push_children(
    stack: &mut Vec<(ZoneId, usize)>,
    parent_of: &mut HashMap<ZoneId, ZoneId>,
    seen: &mut HashSet<ZoneId>,
    decoded: &DecodedCluster,
    depth: usize,
    diag: &mut Diagnostics,
) {
    let parent = decoded.cluster.id;
    // Reverse so the first child is decoded first.
    for &child in decoded.children.iter().rev() {
        if is_ancestor(child, parent, parent_of) {
            diag.anomaly(
                AnomalyKind::Cycle,
                0,
                "decoder",
                format_args!("zone {parent}: child cluster {child} is one of its ancestors"),
            );
            continue;
        }
        if seen.insert(child) {
            parent_of.insert(child, parent);
            stack.push((child, depth));
        }
    }
}

fn is_ancestor(candidate: ZoneId, mut node: ZoneId, parent_of: &HashMap<ZoneId, ZoneId>) -> bool {
    loop {
        if node == candidate {
            return true;
        }
        match parent_of.get(&node) {
            Some(&p) => node = p,
            None => return false,
        }
    }
}

/// Child clusters named by id-list fields, cluster-id lists and cluster links. Zero ids and
/// repeats are dropped.
fn child_clusters(cluster: &Cluster, resolution: &Resolution) -> Vec<ZoneId> {
    let mut out: Vec<ZoneId> = Vec::new();
    let mut push = |id: ZoneId| {
        if id != 0 && id != cluster.id && !out.contains(&id) {
            out.push(id);
        }
    };

    for &id in &cluster.child_ids {
        push(id);
    }
    for resolved in &resolution.resolved {
        if let (LinkOrigin::Named(NamedLink::ClusterList), Payload::FixedArray { records, .. }) =
            (resolved.origin, &resolved.payload)
        {
            for record in records {
                if let Some(id) = read_u32(record, 0, cluster.endianness) {
                    push(id);
                }
            }
        }
    }
    for id in resolution.cluster_ids() {
        push(id);
    }
    out
}

/// Resolves the style list of a Style cluster, using its name list for unnamed styles.
fn style_sheet(
    cluster: &Cluster,
    resolution: &Resolution,
    max_field_depth: usize,
    diag: &mut Diagnostics,
) -> Option<StyleSheet> {
    let kind = cluster.style_kind()?;
    let entries = match resolution.get(LinkOrigin::Data).map(|r| &r.payload) {
        Some(Payload::List(entries)) => entries,
        _ => return None,
    };
    let names = match resolution.get(LinkOrigin::Name).map(|r| &r.payload) {
        Some(Payload::UnicodeList(names)) => Some(names),
        _ => None,
    };
    StyleSheet::build(
        kind,
        entries,
        names,
        cluster.endianness,
        max_field_depth,
        diag,
    )
}
