use anchor_lang::{prelude::*, system_program};
use anchor_spl::token::{self, TokenAccount};

use crate::{errors::EscrowError, state::Escrow};

/// A token account (or mint) must carry the mint recorded in the escrow
pub fn check_mint(actual: &Pubkey, expected: &Pubkey) -> Result<()> {
    require_keys_eq!(*actual, *expected, EscrowError::AssetMismatch);
    Ok(())
}

/// A token account must belong to the party it is supposed to pay or credit
pub fn check_owner(actual: &Pubkey, expected: &Pubkey) -> Result<()> {
    require_keys_eq!(*actual, *expected, EscrowError::Unauthorized);
    Ok(())
}

pub fn check_funds(balance: u64, amount: u64) -> Result<()> {
    require_gte!(balance, amount, EscrowError::InsufficientFunds);
    Ok(())
}

/// No live escrow sits at this address. Stray lamports do not count, only
/// program ownership or data.
pub fn is_free(account: &AccountInfo) -> bool {
    account.owner != &crate::ID && account.data_is_empty()
}

/// Lamports still needed to make an account holding `current` rent exempt
pub fn rent_top_up(current: u64, required: u64) -> u64 {
    required.saturating_sub(current)
}

/// Load the vault of a live escrow.
///
/// The vault must sit at the escrow's associated token address for `mint_a`
/// and still be an initialized token account.
pub fn load_vault(vault: &AccountInfo, escrow: &Pubkey, mint_a: &Pubkey) -> Result<TokenAccount> {
    require_keys_eq!(
        *vault.key,
        Escrow::vault_address(escrow, mint_a),
        EscrowError::RecordNotFound
    );
    if vault.owner != &token::ID || vault.data_is_empty() {
        return err!(EscrowError::RecordNotFound);
    }

    let data = vault.try_borrow_data()?;
    match TokenAccount::try_deserialize(&mut &data[..]) {
        Ok(account) => Ok(account),
        Err(_) => err!(EscrowError::RecordNotFound),
    }
}

/// Close a program-owned account: move all lamports to `destination`,
/// zero and drop the data and hand the account back to the system program.
pub fn close_record<'info>(account: &AccountInfo<'info>, destination: &AccountInfo<'info>) -> Result<()> {
    let lamports = account.lamports();
    let total = destination
        .lamports()
        .checked_add(lamports)
        .ok_or(ProgramError::ArithmeticOverflow)?;

    **destination.try_borrow_mut_lamports()? = total;
    **account.try_borrow_mut_lamports()? = 0;

    let mut data = account.try_borrow_mut_data()?;
    data.fill(0);
    drop(data);

    account.assign(&system_program::ID);
    account.resize(0)?;
    Ok(())
}
