//! Default endpoint URLs.

/// Local explorer backend (REST).
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// Market-data info endpoint (POST `{type: ...}` bodies).
pub const DEFAULT_INFO_URL: &str = "https://api.hyperliquid.xyz/info";

/// Market-data WebSocket (trades, order book, asset contexts).
pub const DEFAULT_WS_URL: &str = "wss://api.hyperliquid.xyz/ws";

/// Explorer WebSocket (blocks, transactions).
pub const DEFAULT_EXPLORER_WS_URL: &str = "wss://rpc.hyperliquid.xyz/ws";
