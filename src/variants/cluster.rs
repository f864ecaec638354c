// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;

use crate::variants::Variant;

/// Group variants into clusters that are small enough to be adjudicated within a
/// single graph.
///
/// Variants are expected to be sorted by chromosome and position. A variant joins the
/// current cluster if it is on the same chromosome and starts at most `max_distance`
/// bases after the end of the cluster's furthest reaching reference allele.
pub fn cluster_variants(variants: &[Arc<Variant>], max_distance: u64) -> Vec<Vec<Arc<Variant>>> {
    let mut clusters: Vec<Vec<Arc<Variant>>> = Vec::new();
    let mut cluster_end = 0;

    for variant in variants {
        let joins = clusters.last().map_or(false, |cluster| {
            cluster[0].chromosome() == variant.chromosome()
                && variant.position() <= cluster_end + max_distance
        });
        if joins {
            cluster_end = cluster_end.max(variant.end());
            if let Some(cluster) = clusters.last_mut() {
                cluster.push(Arc::clone(variant));
            }
        } else {
            cluster_end = variant.end();
            clusters.push(vec![Arc::clone(variant)]);
        }
    }

    clusters
}
