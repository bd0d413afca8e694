/// Seed prefix for escrow record PDAs: `["escrow", maker, seed_le]`
pub const ESCROW_SEED: &[u8] = b"escrow";
