/// Application name
pub const APP_NAME: &str = "lanchat";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Symmetric key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Maximum attachment size in bytes (5 MiB), measured on the decoded payload
pub const MAX_ATTACHMENT_SIZE: usize = 5 * 1024 * 1024;

/// Number of images kept in the local image cache
pub const IMAGE_CACHE_CAPACITY: usize = 20;

/// Characters of the quoted body kept in a reply preview
pub const REPLY_PREVIEW_CHARS: usize = 40;
pub const REPLY_PREVIEW_ELLIPSIS: &str = "...";

/// Label substituted for the sender name on our own messages
pub const OWN_SENDER_LABEL: &str = "You";

/// Relay defaults
pub const DEFAULT_WS_PORT: u16 = 4001;
pub const DEFAULT_HTTP_PORT: u16 = 4000;
pub const DEFAULT_WS_PATH: &str = "/ws";
pub const UPDATE_NAME_PATH: &str = "/update-name";

/// Plain-text notices sent by the relay
pub const NOTICE_NEW_CONNECTION: &str = "New connection:";
pub const NOTICE_CLOSED_CONNECTION: &str = "Closed connection:";
pub const NOTICE_YOUR_ADDRESS: &str = "Your address:";

/// Argon2id cost for stretching a room passphrase (OWASP baseline)
pub const ARGON2_MEMORY_KIB: u32 = 19_456;
pub const ARGON2_ITERATIONS: u32 = 2;
pub const ARGON2_PARALLELISM: u32 = 1;

/// Fixed application salt; rooms have no other shared material to salt with
pub const ROOM_KDF_SALT: &[u8] = b"lanchat-room-salt-v1";

/// Key derivation contexts (BLAKE3), applied to the stretched passphrase
pub const KDF_CONTEXT_ROOM_KEY: &str = "lanchat-room-key-v1";
pub const KDF_CONTEXT_ROOM_FINGERPRINT: &str = "lanchat-room-fingerprint-v1";
