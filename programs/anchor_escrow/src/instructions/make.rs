use anchor_lang::{
    prelude::*,
    system_program::{
        allocate, assign, create_account, transfer, Allocate, Assign, CreateAccount, Transfer,
    },
    Discriminator,
};
use anchor_spl::{
    associated_token::{create_idempotent, AssociatedToken, Create},
    token::{transfer_checked, Mint, Token, TokenAccount, TransferChecked},
};

use crate::{
    constants::ESCROW_SEED,
    errors::EscrowError,
    helpers::{check_funds, is_free, rent_top_up},
    state::Escrow,
};

#[derive(Accounts)]
#[instruction(seed: u64)]
pub struct Make<'info> {
    /// The maker who sets exchange terms and deposits Token A
    /// CHECK: signature enforced by the `signer` constraint
    #[account(mut, signer @ EscrowError::Unauthorized)]
    pub maker: UncheckedAccount<'info>,

    /// Escrow PDA, allocated by the handler once the seed is known to be free
    /// CHECK: address enforced by seeds, liveness checked in `check_free`
    #[account(
        mut,
        seeds = [ESCROW_SEED, maker.key().as_ref(), seed.to_le_bytes().as_ref()],
        bump,
    )]
    pub escrow: UncheckedAccount<'info>,

    /// Token A mint (the token the maker will deposit)
    pub mint_a: Account<'info, Mint>,

    /// Token B mint (the token the maker wants to receive)
    pub mint_b: Account<'info, Mint>,

    /// Maker's token account for Token A (source of deposit)
    #[account(
        mut,
        constraint = maker_ata_a.mint == mint_a.key() @ EscrowError::AssetMismatch,
        constraint = maker_ata_a.owner == maker.key() @ EscrowError::Unauthorized,
    )]
    pub maker_ata_a: Account<'info, TokenAccount>,

    /// Vault owned by the escrow PDA to hold Token A
    /// CHECK: address enforced, created by the handler
    #[account(
        mut,
        address = Escrow::vault_address(&escrow.key(), &mint_a.key()),
    )]
    pub vault: UncheckedAccount<'info>,

    pub associated_token_program: Program<'info, AssociatedToken>,
    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

impl<'info> Make<'info> {
    /// Reject a seed that still has a live escrow behind it
    pub fn check_free(&self) -> Result<()> {
        require!(is_free(&self.escrow), EscrowError::RecordAlreadyExists);
        Ok(())
    }

    /// Allocate the escrow PDA and write the exchange terms
    pub fn init_escrow(&mut self, seed: u64, receive: u64, bumps: &MakeBumps) -> Result<()> {
        let space = Escrow::DISCRIMINATOR.len() + Escrow::INIT_SPACE;
        let lamports = Rent::get()?.minimum_balance(space);

        let maker = self.maker.key();
        let seed_bytes = seed.to_le_bytes();
        let signer_seeds: &[&[&[u8]]] = &[&[
            ESCROW_SEED,
            maker.as_ref(),
            &seed_bytes,
            &[bumps.escrow],
        ]];

        let current = self.escrow.lamports();
        if current == 0 {
            let cpi_accounts = CreateAccount {
                from: self.maker.to_account_info(),
                to: self.escrow.to_account_info(),
            };
            let cpi_program = self.system_program.to_account_info();
            let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

            create_account(cpi_ctx, lamports, space as u64, &crate::ID)?;
        } else {
            // Someone already sent lamports to the PDA, create_account would refuse it
            let top_up = rent_top_up(current, lamports);
            if top_up > 0 {
                let cpi_accounts = Transfer {
                    from: self.maker.to_account_info(),
                    to: self.escrow.to_account_info(),
                };
                let cpi_program = self.system_program.to_account_info();
                let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

                transfer(cpi_ctx, top_up)?;
            }

            let cpi_accounts = Allocate {
                account_to_allocate: self.escrow.to_account_info(),
            };
            let cpi_program = self.system_program.to_account_info();
            let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

            allocate(cpi_ctx, space as u64)?;

            let cpi_accounts = Assign {
                account_to_assign: self.escrow.to_account_info(),
            };
            let cpi_program = self.system_program.to_account_info();
            let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

            assign(cpi_ctx, &crate::ID)?;
        }

        let escrow = Escrow {
            seed,
            maker,
            mint_a: self.mint_a.key(),
            mint_b: self.mint_b.key(),
            receive,
            bump: bumps.escrow,
        };
        let mut data = self.escrow.try_borrow_mut_data()?;
        let mut writer: &mut [u8] = &mut data[..];
        escrow.try_serialize(&mut writer)
    }

    /// Create the vault as the escrow's associated token account for Token A
    pub fn init_vault(&mut self) -> Result<()> {
        let cpi_accounts = Create {
            payer: self.maker.to_account_info(),
            associated_token: self.vault.to_account_info(),
            authority: self.escrow.to_account_info(),
            mint: self.mint_a.to_account_info(),
            system_program: self.system_program.to_account_info(),
            token_program: self.token_program.to_account_info(),
        };
        let cpi_program = self.associated_token_program.to_account_info();
        let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

        create_idempotent(cpi_ctx)
    }

    /// Transfer Token A from maker to vault
    pub fn deposit(&mut self, amount: u64) -> Result<()> {
        let cpi_accounts = TransferChecked {
            from: self.maker_ata_a.to_account_info(),
            mint: self.mint_a.to_account_info(),
            to: self.vault.to_account_info(),
            authority: self.maker.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

        transfer_checked(cpi_ctx, amount, self.mint_a.decimals)
    }
}

/// Handler for the make instruction
pub fn handler(ctx: Context<Make>, seed: u64, receive: u64, amount: u64) -> Result<()> {
    require_gt!(receive, 0, EscrowError::InvalidAmount);
    require_gt!(amount, 0, EscrowError::InvalidAmount);

    // Everything below mutates state, so all preconditions go first
    ctx.accounts.check_free()?;
    check_funds(ctx.accounts.maker_ata_a.amount, amount)?;

    ctx.accounts.init_escrow(seed, receive, &ctx.bumps)?;
    ctx.accounts.init_vault()?;
    ctx.accounts.deposit(amount)?;

    msg!(
        "Escrow {} opened: {} of {} for {} of {}",
        ctx.accounts.escrow.key(),
        amount,
        ctx.accounts.mint_a.key(),
        receive,
        ctx.accounts.mint_b.key()
    );
    Ok(())
}
