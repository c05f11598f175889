use std::collections::HashSet;

use mlo_core::{LinkId, Mac48, OperatingChannel};

use crate::links::LinkSet;

/// One AP link advertised as joinable, learnt from the beacon (exchange
/// link) or from the neighbor report (all other affiliated links).
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub ap_link_id: LinkId,
    pub bssid: Mac48,
    pub channel: OperatingChannel,
}

/// One accepted (own link, AP link) pair of the setup plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupPair {
    pub sta_link: LinkId,
    pub ap_link: LinkId,
    pub bssid: Mac48,
    /// Operating channel the own link adopts for this pair
    pub channel: OperatingChannel,
}

/// Build the setup plan for a multi-link association.
///
/// The exchange pair (the link the frame exchange is occurring on) is always
/// accepted and always first. Every other candidate, in report order, is
/// assigned the lowest-id unassigned local link able to operate on the
/// candidate's channel: a fixed-band link only matches a candidate on its
/// own band, any other link may switch band. A candidate for which no local
/// link remains is dropped from the plan; dropping one candidate never
/// affects the rest of the negotiation.
pub fn plan_setup(
    links: &LinkSet,
    exchange_sta_link: LinkId,
    exchange: Candidate,
    others: &[Candidate],
) -> Vec<SetupPair> {
    let mut pairs = vec![SetupPair {
        sta_link: exchange_sta_link,
        ap_link: exchange.ap_link_id,
        bssid: exchange.bssid,
        channel: exchange.channel,
    }];
    let mut assigned: HashSet<LinkId> = HashSet::from([exchange_sta_link]);

    for cand in others {
        if cand.ap_link_id == exchange.ap_link_id {
            tracing::warn!("candidate repeats the exchange AP link {}, ignoring", cand.ap_link_id);
            continue;
        }

        let feasible = links.iter().find(|l| {
            !assigned.contains(&l.id) && (!l.fixed_band || l.channel.band == cand.channel.band)
        });

        match feasible {
            Some(link) => {
                assigned.insert(link.id);
                pairs.push(SetupPair {
                    sta_link: link.id,
                    ap_link: cand.ap_link_id,
                    bssid: cand.bssid,
                    channel: cand.channel,
                });
            }
            None => {
                // Link setup failure for this one candidate only
                tracing::debug!(
                    "no feasible local link for AP link {} on {}, dropping candidate",
                    cand.ap_link_id,
                    cand.channel
                );
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlo_config::CfgLink;
    use mlo_core::WifiBand::{Band2_4GHz, Band5GHz, Band6GHz};
    use mlo_core::WifiBand;

    fn links(cfg: Vec<(u8, WifiBand, bool)>) -> LinkSet {
        let cfg_links: Vec<CfgLink> = cfg
            .into_iter()
            .map(|(number, band, fixed)| {
                let link = CfgLink::new(number, 20, band, 0);
                if fixed { link.fixed() } else { link }
            })
            .collect();
        LinkSet::new(Mac48([0, 0xC0, 0, 0, 0, 0x10]), &cfg_links)
    }

    fn cand(ap_link_id: LinkId, number: u8, band: WifiBand) -> Candidate {
        Candidate {
            ap_link_id,
            bssid: Mac48([2, 0xC0, 0, 1, 0, 0x20 + ap_link_id]),
            channel: OperatingChannel::new(number, 20, band, 0),
        }
    }

    fn pair_ids(pairs: &[SetupPair]) -> Vec<(LinkId, LinkId)> {
        pairs.iter().map(|p| (p.sta_link, p.ap_link)).collect()
    }

    #[test]
    fn test_matching_channels_setup_all_links() {
        // STA and AP operate three identical channels
        let set = links(vec![(36, Band5GHz, false), (2, Band2_4GHz, false), (1, Band6GHz, false)]);
        let pairs = plan_setup(
            &set,
            0,
            cand(0, 36, Band5GHz),
            &[cand(1, 2, Band2_4GHz), cand(2, 1, Band6GHz)],
        );
        assert_eq!(pair_ids(&pairs), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_band_switching_setups_all_links() {
        // None of the local links is band-fixed, so the two remaining links
        // switch band to match the candidates in report order
        let set = links(vec![(2, Band2_4GHz, false), (1, Band6GHz, false), (36, Band5GHz, false)]);
        let pairs = plan_setup(
            &set,
            2,
            cand(0, 36, Band5GHz),
            &[cand(1, 9, Band6GHz), cand(2, 120, Band5GHz)],
        );
        assert_eq!(pair_ids(&pairs), vec![(2, 0), (0, 1), (1, 2)]);
    }

    #[test]
    fn test_fixed_band_link_excluded() {
        // Local link 0 is fixed to 2.4 GHz and no candidate operates there,
        // so only two pairs result and the last candidate is dropped
        let set = links(vec![(2, Band2_4GHz, true), (36, Band5GHz, false), (8, Band2_4GHz, false)]);
        let pairs = plan_setup(
            &set,
            1,
            cand(0, 36, Band5GHz),
            &[cand(1, 1, Band6GHz), cand(2, 120, Band5GHz)],
        );
        assert_eq!(pair_ids(&pairs), vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn test_all_links_fixed_channel_switch_within_band() {
        // All local links fixed: the 6 GHz candidate finds no feasible link,
        // the second 5 GHz candidate is matched by switching channel only
        let set = links(vec![(2, Band2_4GHz, true), (36, Band5GHz, true), (60, Band5GHz, true)]);
        let pairs = plan_setup(
            &set,
            1,
            cand(0, 36, Band5GHz),
            &[cand(1, 1, Band6GHz), cand(2, 120, Band5GHz)],
        );
        assert_eq!(pair_ids(&pairs), vec![(1, 0), (2, 2)]);
    }

    #[test]
    fn test_single_feasible_pair() {
        let set = links(vec![(2, Band2_4GHz, true), (36, Band5GHz, true)]);
        let pairs = plan_setup(
            &set,
            1,
            cand(0, 36, Band5GHz),
            &[cand(1, 1, Band6GHz), cand(2, 120, Band5GHz)],
        );
        assert_eq!(pair_ids(&pairs), vec![(1, 0)]);
    }

    #[test]
    fn test_fewer_local_links_than_candidates() {
        let set = links(vec![(2, Band2_4GHz, false), (36, Band5GHz, false)]);
        let pairs = plan_setup(
            &set,
            1,
            cand(0, 36, Band5GHz),
            &[cand(1, 1, Band6GHz), cand(2, 120, Band5GHz)],
        );
        assert_eq!(pair_ids(&pairs), vec![(1, 0), (0, 1)]);
    }

    #[test]
    fn test_accepted_links_adopt_candidate_channel() {
        let set = links(vec![(2, Band2_4GHz, false), (36, Band5GHz, false)]);
        let pairs = plan_setup(&set, 1, cand(0, 36, Band5GHz), &[cand(1, 9, Band6GHz)]);
        assert_eq!(pairs[1].channel, OperatingChannel::new(9, 20, Band6GHz, 0));
        assert_eq!(pairs[1].bssid, Mac48([2, 0xC0, 0, 1, 0, 0x21]));
    }
}
