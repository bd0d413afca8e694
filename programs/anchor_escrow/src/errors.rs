use anchor_lang::prelude::*;

#[error_code]
pub enum EscrowError {
    #[msg("Unauthorized: missing signature or signer does not match escrow authority")]
    Unauthorized,
    #[msg("Insufficient funds: source token account balance is too low")]
    InsufficientFunds,
    #[msg("Record not found: escrow or vault does not exist or was already consumed")]
    RecordNotFound,
    #[msg("Record already exists: an escrow with this seed is still live")]
    RecordAlreadyExists,
    #[msg("Asset mismatch: supplied mint or token account does not match escrow")]
    AssetMismatch,
    #[msg("Invalid amount: amount must be greater than zero")]
    InvalidAmount,
}
