use anchor_lang::prelude::*;
use anchor_spl::associated_token::get_associated_token_address;

use crate::{constants::ESCROW_SEED, errors::EscrowError, helpers::check_mint};

/// Escrow account that stores all the exchange terms
///
/// The record is written once by `make` and never mutated afterwards; `take`
/// and `refund` only ever close it.
#[account(discriminator = 1)]
#[derive(InitSpace, Debug)]
pub struct Escrow {
    /// Seed used for PDA derivation, lets one maker run several offers
    pub seed: u64,
    /// The maker's wallet address (creator of the escrow)
    pub maker: Pubkey,
    /// Token A mint address (the token maker deposits)
    pub mint_a: Pubkey,
    /// Token B mint address (the token maker wants to receive)
    pub mint_b: Pubkey,
    /// Amount of Token B the maker wants to receive
    pub receive: u64,
    /// Bump seed for PDA derivation (cached for efficiency)
    pub bump: u8,
}

impl Escrow {
    /// Derive the escrow PDA for `(maker, seed)`
    pub fn derive_address(maker: &Pubkey, seed: u64) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[ESCROW_SEED, maker.as_ref(), &seed.to_le_bytes()],
            &crate::ID,
        )
    }

    /// The vault is the escrow's associated token account for Token A
    pub fn vault_address(escrow: &Pubkey, mint_a: &Pubkey) -> Pubkey {
        get_associated_token_address(escrow, mint_a)
    }

    /// Load a live escrow record from an account.
    ///
    /// Anything that is not a funded, program-owned account carrying the
    /// escrow discriminator is reported as `RecordNotFound`, which covers
    /// records already consumed by `take` or `refund`.
    pub fn load(info: &AccountInfo) -> Result<Self> {
        if info.owner != &crate::ID || info.lamports() == 0 || info.data_is_empty() {
            return err!(EscrowError::RecordNotFound);
        }

        let data = info.try_borrow_data()?;
        match Self::try_deserialize(&mut &data[..]) {
            Ok(escrow) => Ok(escrow),
            Err(_) => err!(EscrowError::RecordNotFound),
        }
    }

    /// Re-derive the PDA from the stored terms and compare with `escrow`
    pub fn check_address(&self, escrow: &Pubkey) -> Result<()> {
        let expected = Pubkey::create_program_address(
            &[
                ESCROW_SEED,
                self.maker.as_ref(),
                &self.seed.to_le_bytes(),
                &[self.bump],
            ],
            &crate::ID,
        )
        .map_err(|_| error!(EscrowError::RecordNotFound))?;

        require_keys_eq!(expected, *escrow, EscrowError::RecordNotFound);
        Ok(())
    }

    pub fn check_maker(&self, maker: &Pubkey) -> Result<()> {
        require_keys_eq!(self.maker, *maker, EscrowError::Unauthorized);
        Ok(())
    }

    pub fn check_mint_a(&self, mint_a: &Pubkey) -> Result<()> {
        check_mint(mint_a, &self.mint_a)
    }

    pub fn check_mint_b(&self, mint_b: &Pubkey) -> Result<()> {
        check_mint(mint_b, &self.mint_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code;
    use anchor_lang::Discriminator;

    fn sample(maker: Pubkey, seed: u64) -> Escrow {
        let (_, bump) = Escrow::derive_address(&maker, seed);
        Escrow {
            seed,
            maker,
            mint_a: Pubkey::new_unique(),
            mint_b: Pubkey::new_unique(),
            receive: 10,
            bump,
        }
    }

    fn serialized(escrow: &Escrow) -> Vec<u8> {
        let mut data: Vec<u8> = Vec::new();
        escrow.try_serialize(&mut data).unwrap();
        data
    }

    #[test]
    fn address_depends_on_maker_and_seed() {
        let maker = Pubkey::new_unique();
        let other = Pubkey::new_unique();

        let (first, _) = Escrow::derive_address(&maker, 1);
        assert_eq!(first, Escrow::derive_address(&maker, 1).0);
        assert_ne!(first, Escrow::derive_address(&maker, 2).0);
        assert_ne!(first, Escrow::derive_address(&other, 1).0);
    }

    #[test]
    fn vault_is_bound_to_escrow_and_mint() {
        let maker = Pubkey::new_unique();
        let (escrow, _) = Escrow::derive_address(&maker, 1);
        let (sibling, _) = Escrow::derive_address(&maker, 2);
        let mint_a = Pubkey::new_unique();

        let vault = Escrow::vault_address(&escrow, &mint_a);
        assert_ne!(vault, escrow);
        assert_ne!(vault, Escrow::vault_address(&sibling, &mint_a));
        assert_ne!(vault, Escrow::vault_address(&escrow, &Pubkey::new_unique()));
    }

    #[test]
    fn record_layout() {
        assert_eq!(Escrow::INIT_SPACE, 113);
        assert_eq!(Escrow::DISCRIMINATOR, &[1]);

        let escrow = sample(Pubkey::new_unique(), 7);
        let data = serialized(&escrow);

        assert_eq!(data.len(), 1 + Escrow::INIT_SPACE);
        assert_eq!(data[0], 1);
        assert_eq!(&data[1..9], &7u64.to_le_bytes());
        assert_eq!(&data[9..41], escrow.maker.as_ref());
        assert_eq!(&data[41..73], escrow.mint_a.as_ref());
        assert_eq!(&data[73..105], escrow.mint_b.as_ref());
        assert_eq!(&data[105..113], &10u64.to_le_bytes());
        assert_eq!(data[113], escrow.bump);
    }

    #[test]
    fn check_address_rederives_pda() {
        let maker = Pubkey::new_unique();
        let escrow = sample(maker, 1);
        let (address, _) = Escrow::derive_address(&maker, 1);

        assert!(escrow.check_address(&address).is_ok());

        let (other, _) = Escrow::derive_address(&maker, 2);
        let err = escrow.check_address(&other).unwrap_err();
        assert_eq!(error_code(err), u32::from(EscrowError::RecordNotFound));
    }

    #[test]
    fn only_the_maker_passes_check_maker() {
        let maker = Pubkey::new_unique();
        let escrow = sample(maker, 1);

        assert!(escrow.check_maker(&maker).is_ok());
        let err = escrow.check_maker(&Pubkey::new_unique()).unwrap_err();
        assert_eq!(error_code(err), u32::from(EscrowError::Unauthorized));
    }

    #[test]
    fn mints_must_match_terms() {
        let escrow = sample(Pubkey::new_unique(), 1);

        assert!(escrow.check_mint_a(&escrow.mint_a).is_ok());
        assert!(escrow.check_mint_b(&escrow.mint_b).is_ok());

        let err = escrow.check_mint_a(&escrow.mint_b).unwrap_err();
        assert_eq!(error_code(err), u32::from(EscrowError::AssetMismatch));
        let err = escrow.check_mint_b(&escrow.mint_a).unwrap_err();
        assert_eq!(error_code(err), u32::from(EscrowError::AssetMismatch));
    }

    #[test]
    fn load_reads_live_record() {
        let maker = Pubkey::new_unique();
        let escrow = sample(maker, 3);
        let (key, _) = Escrow::derive_address(&maker, 3);
        let owner = crate::ID;
        let mut lamports = 1_000_000;
        let mut data = serialized(&escrow);
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &owner, false, 0);

        let loaded = Escrow::load(&info).unwrap();
        assert_eq!(loaded.seed, 3);
        assert_eq!(loaded.maker, maker);
        assert_eq!(loaded.mint_a, escrow.mint_a);
        assert_eq!(loaded.mint_b, escrow.mint_b);
        assert_eq!(loaded.receive, 10);
        assert_eq!(loaded.bump, escrow.bump);
    }

    #[test]
    fn load_rejects_foreign_or_empty_accounts() {
        let key = Pubkey::new_unique();
        let escrow = sample(Pubkey::new_unique(), 1);

        // owned by another program
        let owner = Pubkey::new_unique();
        let mut lamports = 1_000_000;
        let mut data = serialized(&escrow);
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &owner, false, 0);
        let err = Escrow::load(&info).unwrap_err();
        assert_eq!(error_code(err), u32::from(EscrowError::RecordNotFound));

        // never created
        let owner = anchor_lang::system_program::ID;
        let mut lamports = 0;
        let mut data: Vec<u8> = Vec::new();
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &owner, false, 0);
        let err = Escrow::load(&info).unwrap_err();
        assert_eq!(error_code(err), u32::from(EscrowError::RecordNotFound));

        // right owner, wrong discriminator
        let owner = crate::ID;
        let mut lamports = 1_000_000;
        let mut data = serialized(&escrow);
        data[0] = 9;
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &owner, false, 0);
        let err = Escrow::load(&info).unwrap_err();
        assert_eq!(error_code(err), u32::from(EscrowError::RecordNotFound));
    }
}
