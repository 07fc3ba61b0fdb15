use alloy_primitives::utils::parse_units;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::errors::SaleError;

sol! {
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool success);
    }

    interface ITokenSale {
        function order(string selendraAddress, uint256 amount) external;
    }
}

/// Allowance requested by every approval: `10^18` whole tokens.
pub const MAX_APPROVAL_TOKENS: &str = "1000000000000000000";

pub fn encode_allowance(owner: Address, spender: Address) -> Bytes {
    IERC20::allowanceCall { owner, spender }.abi_encode().into()
}

pub fn decode_allowance(data: &[u8]) -> Result<U256, SaleError> {
    IERC20::allowanceCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| SaleError::Query(format!("Cannot decode allowance: {e}")))
}

pub fn encode_approve(spender: Address, value: U256) -> Bytes {
    IERC20::approveCall { spender, value }.abi_encode().into()
}

pub fn encode_order(target_address: &str, amount: U256) -> Bytes {
    ITokenSale::orderCall {
        selendraAddress: target_address.to_string(),
        amount,
    }
    .abi_encode()
    .into()
}

/// Maximal approval scaled by the token's decimals.
pub fn max_approval(decimals: u8) -> Result<U256, SaleError> {
    scale_units(MAX_APPROVAL_TOKENS, decimals)
}

/// Scale a decimal string into base units (`"1.5"`, 18 → `1.5 * 10^18`).
pub fn scale_units(amount: &str, decimals: u8) -> Result<U256, SaleError> {
    let trimmed = amount.trim();
    if trimmed.starts_with('-') {
        return Err(SaleError::validation("Amount must be positive"));
    }
    check_decimal(trimmed, decimals)?;
    parse_units(trimmed, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| SaleError::validation(format!("Invalid amount: {e}")))
}

/// Plain decimal: ASCII digits with at most one `.` and no more fractional
/// digits than the token has.
fn check_decimal(amount: &str, decimals: u8) -> Result<(), SaleError> {
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction) {
        return Err(SaleError::validation(format!("Invalid amount: {amount}")));
    }
    if fraction.len() > decimals as usize {
        return Err(SaleError::validation(format!(
            "Amount has more than {decimals} decimal places"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn allowance_selector() {
        let data = encode_allowance(Address::ZERO, Address::ZERO);
        assert_eq!(&data[..4], &[0xdd, 0x62, 0xed, 0x3e]);
        assert_eq!(data.len(), 4 + 32 * 2);
    }

    #[test]
    fn approve_selector() {
        let data = encode_approve(Address::ZERO, U256::from(1));
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(data[data.len() - 1], 1);
    }

    #[test]
    fn order_encodes_dynamic_string() {
        let data = encode_order("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY", U256::from(7));
        // selector + offset + amount + length + 48 bytes padded to 64
        assert_eq!(data.len(), 4 + 32 * 3 + 64);
        let decoded = ITokenSale::orderCall::abi_decode(&data, true).unwrap();
        assert_eq!(
            decoded.selendraAddress,
            "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"
        );
        assert_eq!(decoded.amount, U256::from(7));
    }

    #[test]
    fn decodes_allowance_word() {
        let mut word = [0u8; 32];
        word[31] = 42;
        assert_eq!(decode_allowance(&word).unwrap(), U256::from(42));
        assert!(decode_allowance(&[1, 2, 3]).is_err());
    }

    #[test]
    fn max_approval_is_ten_to_the_thirty_six() {
        let expected = U256::from(10u64).pow(U256::from(36u64));
        assert_eq!(max_approval(18).unwrap(), expected);
    }

    #[test]
    fn scales_whole_and_fractional_amounts() {
        let one = U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(scale_units("100", 18).unwrap(), one * U256::from(100));
        assert_eq!(scale_units("1.5", 18).unwrap(), one * U256::from(3) / U256::from(2));
    }

    #[test]
    fn rejects_bad_amounts() {
        assert!(scale_units("-1", 18).is_err());
        assert!(scale_units("abc", 18).is_err());
        for amount in ["1_000", "1.2.3", ".", "1e18", "+5", "0x10"] {
            assert!(scale_units(amount, 18).is_err(), "{amount}");
        }
    }

    #[test]
    fn rejects_excess_fraction_digits() {
        assert!(scale_units("1.0000000000000000001", 18).is_err());
        assert!(scale_units("1.123", 2).is_err());
        assert!(scale_units("1.000000000000000001", 18).is_ok());
    }

    #[test]
    fn spender_is_encoded() {
        let spender = address!("1ea5d1c9434b89b03c4aac95dd4c56cd86430385");
        let data = encode_approve(spender, U256::ZERO);
        assert_eq!(&data[4 + 12..4 + 32], spender.as_slice());
    }
}
