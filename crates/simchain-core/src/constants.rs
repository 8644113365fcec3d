pub const WORD_BYTES: usize = 4;
pub const BLOCK_WORDS: usize = 16;
pub const SCHEDULE_WORDS: usize = 64;
pub const STATE_WORDS: usize = 8;
pub const HASH_SIZE: usize = STATE_WORDS * WORD_BYTES;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const BLOCK_VERSION: &str = "v0.1";
pub const DEFAULT_DIFFICULTY: u8 = 2;
pub const MAX_DIFFICULTY: u8 = HASH_HEX_SIZE as u8;
pub const TRANSACTIONS_PER_BLOCK: usize = 100;
pub const DEFAULT_WORKERS: usize = 4;
