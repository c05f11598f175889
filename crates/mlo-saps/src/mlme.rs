use mlo_core::{LinkId, Mac48};

/// Request from the harness to a non-AP MLD: start discovery and association
/// with the network of the given name.
#[derive(Debug)]
pub struct MlmeJoinReq {
    pub ssid: String,
}

/// Indication from the AP MLD to the harness: a station completed
/// association. Used by the harness to sequence multiple joining stations.
#[derive(Debug)]
pub struct MlmeAssocInd {
    pub aid: u16,
    pub sta_mld_address: Mac48,
}

/// Confirmation from a non-AP MLD to the harness: outcome of the setup
/// attempt. On success, `setup_links` lists the accepted
/// (own link, AP link) pairs.
#[derive(Debug)]
pub struct MlmeAssocConf {
    pub success: bool,
    pub setup_links: Vec<(LinkId, LinkId)>,
}

/// Request from the harness to a non-AP MLD: disassociate from the AP and
/// tear down all links.
#[derive(Debug)]
pub struct MlmeDisassocReq {
    pub reason_code: u16,
}
