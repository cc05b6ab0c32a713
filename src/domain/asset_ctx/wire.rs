//! Wire types for per-asset market contexts (WS `allDexsAssetCtxs`, REST
//! `metaAndAssetCtxs`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WsAssetCtx {
    pub funding: Decimal,
    pub open_interest: Decimal,
    pub prev_day_px: Decimal,
    pub day_ntl_vlm: Decimal,
    #[serde(default)]
    pub premium: Option<Decimal>,
    pub oracle_px: Decimal,
    pub mark_px: Decimal,
    #[serde(default)]
    pub mid_px: Option<Decimal>,
    #[serde(default)]
    pub impact_pxs: Option<Vec<Decimal>>,
    #[serde(default)]
    pub day_base_vlm: Option<Decimal>,
}

/// `data` of an `allDexsAssetCtxs` message: one entry per venue, each with
/// contexts in universe order. The main venue is named `""`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsAllDexsAssetCtxs {
    pub ctxs: Vec<(String, Vec<WsAssetCtx>)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UniverseAsset {
    pub name: String,
    #[serde(default)]
    pub sz_decimals: u32,
    #[serde(default)]
    pub max_leverage: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meta {
    pub universe: Vec<UniverseAsset>,
}

/// `metaAndAssetCtxs` response: `[meta, ctxs]`.
pub type MetaAndAssetCtxs = (Meta, Vec<WsAssetCtx>);

#[derive(Debug, Clone, Serialize)]
pub struct InfoRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
}
