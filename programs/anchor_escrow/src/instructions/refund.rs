use anchor_lang::prelude::*;
use anchor_spl::token::{
    close_account, transfer_checked, CloseAccount, Mint, Token, TokenAccount, TransferChecked,
};

use crate::{
    constants::ESCROW_SEED,
    errors::EscrowError,
    helpers::{check_mint, close_record, load_vault},
    state::Escrow,
};

#[derive(Accounts)]
pub struct Refund<'info> {
    /// The maker who originally created the escrow (only they can refund)
    /// CHECK: signature enforced by the `signer` constraint, identity by `Refund::load_escrow`
    #[account(mut, signer @ EscrowError::Unauthorized)]
    pub maker: UncheckedAccount<'info>,

    /// Escrow account storing exchange terms (will be closed)
    /// CHECK: loaded and validated by `Refund::load_escrow`
    #[account(mut)]
    pub escrow: UncheckedAccount<'info>,

    /// Token A mint
    pub mint_a: Account<'info, Mint>,

    /// Vault holding Token A (owned by escrow)
    /// CHECK: loaded and validated by `helpers::load_vault`
    #[account(mut)]
    pub vault: UncheckedAccount<'info>,

    /// Maker's token account for Token A (receives refund)
    #[account(mut)]
    pub maker_ata_a: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

impl<'info> Refund<'info> {
    /// Load the live escrow and make sure the caller is its maker
    pub fn load_escrow(&self) -> Result<Escrow> {
        let escrow = Escrow::load(&self.escrow)?;

        escrow.check_maker(&self.maker.key())?;
        escrow.check_address(&self.escrow.key())?;

        escrow.check_mint_a(&self.mint_a.key())?;
        check_mint(&self.maker_ata_a.mint, &escrow.mint_a)?;

        Ok(escrow)
    }

    /// Withdraw all Token A from vault back to maker and close the vault
    pub fn refund_and_close_vault(&mut self, escrow: &Escrow, amount: u64) -> Result<()> {
        let seed_bytes = escrow.seed.to_le_bytes();
        let signer_seeds: &[&[&[u8]]] = &[&[
            ESCROW_SEED,
            escrow.maker.as_ref(),
            &seed_bytes,
            &[escrow.bump],
        ]];

        // Transfer all Token A from vault back to maker
        let cpi_accounts = TransferChecked {
            from: self.vault.to_account_info(),
            mint: self.mint_a.to_account_info(),
            to: self.maker_ata_a.to_account_info(),
            authority: self.escrow.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

        transfer_checked(cpi_ctx, amount, self.mint_a.decimals)?;

        // Close the vault account and return rent to maker
        let cpi_accounts = CloseAccount {
            account: self.vault.to_account_info(),
            destination: self.maker.to_account_info(),
            authority: self.escrow.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

        close_account(cpi_ctx)
    }

    pub fn close_escrow(&mut self) -> Result<()> {
        close_record(&self.escrow.to_account_info(), &self.maker.to_account_info())
    }
}

/// Handler for the refund instruction
pub fn handler(ctx: Context<Refund>) -> Result<()> {
    let escrow = ctx.accounts.load_escrow()?;
    let vault = load_vault(&ctx.accounts.vault, &ctx.accounts.escrow.key(), &escrow.mint_a)?;

    // Withdraw Token A from vault back to maker and close vault
    ctx.accounts.refund_and_close_vault(&escrow, vault.amount)?;

    ctx.accounts.close_escrow()?;

    msg!(
        "Escrow {} refunded: {} of {} returned to {}",
        ctx.accounts.escrow.key(),
        vault.amount,
        escrow.mint_a,
        escrow.maker
    );
    Ok(())
}
