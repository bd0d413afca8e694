use anchor_lang::prelude::*;
use anchor_spl::token::{
    close_account, transfer_checked, CloseAccount, Mint, Token, TokenAccount, TransferChecked,
};

use crate::{
    constants::ESCROW_SEED,
    errors::EscrowError,
    helpers::{check_funds, check_mint, check_owner, close_record, load_vault},
    state::Escrow,
};

#[derive(Accounts)]
pub struct Take<'info> {
    /// The taker who accepts the exchange terms
    /// CHECK: signature enforced by the `signer` constraint
    #[account(mut, signer @ EscrowError::Unauthorized)]
    pub taker: UncheckedAccount<'info>,

    /// The original maker who created the escrow, receives both rent refunds
    #[account(mut)]
    pub maker: SystemAccount<'info>,

    /// Escrow account storing exchange terms (will be closed)
    /// CHECK: loaded and validated by `Take::load_escrow`
    #[account(mut)]
    pub escrow: UncheckedAccount<'info>,

    /// Token A mint
    pub mint_a: Box<Account<'info, Mint>>,

    /// Token B mint
    pub mint_b: Box<Account<'info, Mint>>,

    /// Vault holding Token A (owned by escrow, will be closed)
    /// CHECK: loaded and validated by `helpers::load_vault`
    #[account(mut)]
    pub vault: UncheckedAccount<'info>,

    /// Taker's token account for Token A (receives Token A)
    #[account(mut)]
    pub taker_ata_a: Box<Account<'info, TokenAccount>>,

    /// Taker's token account for Token B (source of Token B)
    #[account(mut)]
    pub taker_ata_b: Box<Account<'info, TokenAccount>>,

    /// Maker's token account for Token B (receives Token B)
    #[account(mut)]
    pub maker_ata_b: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

impl<'info> Take<'info> {
    /// Load the live escrow and check every supplied account against its terms
    pub fn load_escrow(&self) -> Result<Escrow> {
        let escrow = Escrow::load(&self.escrow)?;

        escrow.check_maker(&self.maker.key())?;
        escrow.check_address(&self.escrow.key())?;

        escrow.check_mint_a(&self.mint_a.key())?;
        escrow.check_mint_b(&self.mint_b.key())?;
        check_mint(&self.taker_ata_a.mint, &escrow.mint_a)?;
        check_mint(&self.taker_ata_b.mint, &escrow.mint_b)?;
        check_mint(&self.maker_ata_b.mint, &escrow.mint_b)?;

        check_owner(&self.taker_ata_b.owner, &self.taker.key())?;
        check_owner(&self.maker_ata_b.owner, &escrow.maker)?;

        Ok(escrow)
    }

    /// Transfer Token B from taker to maker
    pub fn transfer_to_maker(&mut self, escrow: &Escrow) -> Result<()> {
        let cpi_accounts = TransferChecked {
            from: self.taker_ata_b.to_account_info(),
            mint: self.mint_b.to_account_info(),
            to: self.maker_ata_b.to_account_info(),
            authority: self.taker.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

        transfer_checked(cpi_ctx, escrow.receive, self.mint_b.decimals)
    }

    /// Withdraw Token A from vault to taker, then close the vault
    pub fn withdraw_and_close_vault(&mut self, escrow: &Escrow, amount: u64) -> Result<()> {
        let seed_bytes = escrow.seed.to_le_bytes();
        let signer_seeds: &[&[&[u8]]] = &[&[
            ESCROW_SEED,
            escrow.maker.as_ref(),
            &seed_bytes,
            &[escrow.bump],
        ]];

        // Transfer all Token A from vault to taker
        let cpi_accounts = TransferChecked {
            from: self.vault.to_account_info(),
            mint: self.mint_a.to_account_info(),
            to: self.taker_ata_a.to_account_info(),
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

    /// Close the escrow record and return its rent to maker
    pub fn close_escrow(&mut self) -> Result<()> {
        close_record(&self.escrow.to_account_info(), &self.maker.to_account_info())
    }
}

/// Handler for the take instruction
pub fn handler(ctx: Context<Take>) -> Result<()> {
    let escrow = ctx.accounts.load_escrow()?;
    let vault = load_vault(&ctx.accounts.vault, &ctx.accounts.escrow.key(), &escrow.mint_a)?;
    check_funds(ctx.accounts.taker_ata_b.amount, escrow.receive)?;

    // First, transfer Token B from taker to maker
    ctx.accounts.transfer_to_maker(&escrow)?;

    // Then, withdraw Token A from vault to taker and close vault
    ctx.accounts.withdraw_and_close_vault(&escrow, vault.amount)?;

    ctx.accounts.close_escrow()?;

    msg!(
        "Escrow {} taken: {} of {} for {} of {}",
        ctx.accounts.escrow.key(),
        vault.amount,
        escrow.mint_a,
        escrow.receive,
        escrow.mint_b
    );
    Ok(())
}
