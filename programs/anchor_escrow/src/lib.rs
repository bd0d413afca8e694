use anchor_lang::prelude::*;

mod constants;
mod errors;
mod helpers;
mod instructions;
mod state;

pub use constants::ESCROW_SEED;
pub use errors::EscrowError;
pub use state::Escrow;

use instructions::*;

declare_id!("22222222222222222222222222222222222222222222");

#[program]
pub mod anchor_escrow {
    use super::*;

    /// Create a new escrow: maker deposits Token A and sets exchange terms
    #[instruction(discriminator = 0)]
    pub fn make(ctx: Context<Make>, seed: u64, receive: u64, amount: u64) -> Result<()> {
        instructions::make::handler(ctx, seed, receive, amount)
    }

    /// Accept the escrow: taker sends Token B, receives Token A
    #[instruction(discriminator = 1)]
    pub fn take(ctx: Context<Take>) -> Result<()> {
        instructions::take::handler(ctx)
    }

    /// Cancel the escrow: maker reclaims Token A
    #[instruction(discriminator = 2)]
    pub fn refund(ctx: Context<Refund>) -> Result<()> {
        instructions::refund::handler(ctx)
    }
}

/// Custom error code carried by an anchor error
#[cfg(test)]
pub(crate) fn error_code(err: anchor_lang::error::Error) -> u32 {
    match err {
        anchor_lang::error::Error::AnchorError(e) => e.error_code_number,
        anchor_lang::error::Error::ProgramError(e) => panic!("expected anchor error, got {e:?}"),
    }
}
