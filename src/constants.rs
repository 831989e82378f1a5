// src/constants.rs
//! Names shared across the command boundary and the query cache.
//!
//! Command names are the backend's vocabulary; query-key names are ours.
//! Both are plain strings on the wire, so they live in one place.

// ---------------------------------------------------------------------------
// Backend commands
// ---------------------------------------------------------------------------

pub const LOAD_CONFIGURATION_COMMAND: &str = "load_configuration_command";
pub const GET_BLOCK_COMMAND: &str = "get_block_command";
pub const CREATE_BLOCK_COMMAND: &str = "create_block_command";
pub const LOAD_BLOCKS_FOR_PAGE_COMMAND: &str = "load_blocks_for_page_command";
pub const CHANGE_BLOCK_ORDER_COMMAND: &str = "change_block_order_command";
pub const LOAD_HOME_PAGE_COMMAND: &str = "load_home_page_command";

// ---------------------------------------------------------------------------
// Query keys
// ---------------------------------------------------------------------------

/// Family of per-block content queries, `["displayedBlock", {id}]`.
pub const DISPLAYED_BLOCK_QUERY: &str = "displayedBlock";

/// The compound configuration + workspace query, `["loadConfiguration"]`.
pub const LOAD_CONFIGURATION_QUERY: &str = "loadConfiguration";

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// How many query results the cache keeps before evicting the least
/// recently used one.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Upper bound accepted for `--cache-capacity`.
pub const MAX_CACHE_CAPACITY: usize = 65_536;

/// Capacity of the query event channel; slow subscribers lag past this.
pub const QUERY_EVENT_BUFFER: usize = 64;

/// Name stored in a freshly created workspace block.
pub const WORKSPACE_TITLE: &str = "Workspace";

/// Title given to the page created alongside a fresh workspace.
pub const HOME_PAGE_TITLE: &str = "Home";

/// File name used for the block store when no path is configured.
pub const DEFAULT_DATA_FILE_NAME: &str = "myblocks.json";
