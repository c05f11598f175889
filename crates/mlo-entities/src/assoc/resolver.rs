use mlo_pdus::elements::ReducedNeighborReport;

/// Position of one reported AP inside a neighbor report: index of the
/// Neighbor AP Information field and index of the TBTT Information field
/// within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffiliatedApRef {
    pub nbr_ap_info_id: usize,
    pub tbtt_info_id: usize,
}

/// Find the first AP at or after `start_nbr_id` that is affiliated with the
/// same AP MLD as the AP that transmitted the report. Neighbor AP Info
/// fields are scanned in report order, TBTT fields in field order; the
/// match predicate is an MLD Parameters subfield with AP MLD ID 0.
///
/// Pure and idempotent; returns None when no such AP exists.
pub fn next_affiliated_ap(rnr: &ReducedNeighborReport, start_nbr_id: usize) -> Option<AffiliatedApRef> {
    for (nbr_id, nbr) in rnr.nbr_ap_infos.iter().enumerate().skip(start_nbr_id) {
        for (tbtt_id, tbtt) in nbr.tbtts.iter().enumerate() {
            if tbtt.mld_params.as_ref().is_some_and(|mld| mld.ap_mld_id == 0) {
                return Some(AffiliatedApRef { nbr_ap_info_id: nbr_id, tbtt_info_id: tbtt_id });
            }
        }
    }
    None
}

/// All affiliated APs of the report, in ascending Neighbor AP Info order.
/// Equivalent to repeated `next_affiliated_ap` calls, each restarting just
/// past the previous match's Neighbor AP Info field; at most one entry per
/// field is returned, since two APs of one MLD do not share a channel group.
pub fn all_affiliated_aps(rnr: &ReducedNeighborReport) -> Vec<AffiliatedApRef> {
    let mut found = Vec::new();
    let mut start = 0;
    while let Some(ap) = next_affiliated_ap(rnr, start) {
        start = ap.nbr_ap_info_id + 1;
        found.push(ap);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlo_core::Mac48;
    use mlo_pdus::elements::{MldParameters, NeighborApInfo, TbttInfo};

    fn tbtt(mld: Option<u8>) -> TbttInfo {
        TbttInfo {
            tbtt_offset: 0,
            bssid: Mac48([2, 0, 0, 0, 0, 0]),
            mld_params: mld.map(|id| MldParameters {
                ap_mld_id: id,
                link_id: 0,
                bss_params_change_count: 0,
            }),
        }
    }

    fn nbr(mlds: Vec<Option<u8>>) -> NeighborApInfo {
        NeighborApInfo {
            op_class: 115,
            channel: 36,
            tbtts: mlds.into_iter().map(tbtt).collect(),
        }
    }

    /// First field has no MLD Parameters at all; the second's first TBTT is
    /// affiliated; the third reports only foreign MLDs; the fourth is
    /// affiliated in its second TBTT.
    fn sample_report() -> ReducedNeighborReport {
        ReducedNeighborReport {
            nbr_ap_infos: vec![
                nbr(vec![None, None]),
                nbr(vec![Some(0), Some(5)]),
                nbr(vec![Some(3), Some(4)]),
                nbr(vec![Some(6), Some(0)]),
            ],
        }
    }

    #[test]
    fn test_next_affiliated_ap() {
        let rnr = sample_report();

        let first = next_affiliated_ap(&rnr, 0).expect("expected a first affiliated AP");
        assert_eq!(first.nbr_ap_info_id, 1);
        assert_eq!(first.tbtt_info_id, 0);

        let second = next_affiliated_ap(&rnr, first.nbr_ap_info_id + 1).expect("expected a second affiliated AP");
        assert_eq!(second.nbr_ap_info_id, 3);
        assert_eq!(second.tbtt_info_id, 1);

        assert_eq!(next_affiliated_ap(&rnr, second.nbr_ap_info_id + 1), None);
    }

    #[test]
    fn test_all_affiliated_aps() {
        let rnr = sample_report();
        let all = all_affiliated_aps(&rnr);
        assert_eq!(
            all,
            vec![
                AffiliatedApRef { nbr_ap_info_id: 1, tbtt_info_id: 0 },
                AffiliatedApRef { nbr_ap_info_id: 3, tbtt_info_id: 1 },
            ]
        );
    }

    #[test]
    fn test_empty_report() {
        let rnr = ReducedNeighborReport::new();
        assert_eq!(next_affiliated_ap(&rnr, 0), None);
        assert!(all_affiliated_aps(&rnr).is_empty());
    }

    #[test]
    fn test_start_beyond_end() {
        let rnr = sample_report();
        assert_eq!(next_affiliated_ap(&rnr, 17), None);
    }

    #[test]
    fn test_no_duplicate_nbr_ids() {
        // Even a malformed group with two affiliated TBTT entries yields at
        // most one match per Neighbor AP Info field
        let rnr = ReducedNeighborReport { nbr_ap_infos: vec![nbr(vec![Some(0), Some(0)])] };
        let all = all_affiliated_aps(&rnr);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tbtt_info_id, 0);
    }
}
