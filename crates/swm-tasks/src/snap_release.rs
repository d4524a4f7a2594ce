//! `snap-release-to-<risk>` tasks (spec.md §4.4/§4.6, ground:
//! `original_source/stable/wfl/wft/kernel_snap.py`): promote a snap
//! revision into a risk level once it's consistently published across every
//! expected architecture and track.

use swm_clients::TaskStatus;
use swm_snap::SnapChannelMap;
use swm_tracker::ReasonKind;

use crate::decision::TaskDecision;

#[derive(Debug, Clone)]
pub struct SnapReleaseContext {
    pub risk: String,
    pub expected_tracks: Vec<String>,
    pub expected_arches: Vec<String>,
    pub wanted_version: String,
}

/// Decide a `snap-release-to-<risk>` task from its channel map: `Fix
/// Released` once every expected `(track, arch)` pairing at this risk
/// publishes the wanted version; `Stalled` with the divergent revisions if
/// the tracks disagree with each other; otherwise left `Ongoing`.
#[must_use]
pub fn snap_release_decision(
    ctx: &SnapReleaseContext,
    map: &SnapChannelMap,
    current_status: TaskStatus,
) -> TaskDecision {
    if map.is_in_tracks(
        &ctx.expected_tracks,
        &ctx.expected_arches,
        &ctx.risk,
        &ctx.wanted_version,
    ) {
        return TaskDecision::to_status_only(TaskStatus::FixReleased);
    }

    let divergence = map.channel_revisions_consistent();
    if !divergence.is_empty() {
        let detail = divergence
            .iter()
            .map(swm_snap::ChannelDivergence::describe)
            .collect::<Vec<_>>()
            .join("; ");
        return TaskDecision::stall(format!("channel revisions diverge: {detail}"));
    }

    TaskDecision::to(
        current_status,
        ReasonKind::Ongoing,
        format!("waiting for {} publication", ctx.risk),
    )
}
