//! Token amount and gas unit types.
//!
//! Amounts at the API boundary must carry explicit units: `"5 NEAR"`,
//! `"1000 yocto"`, or a `u128` of yoctoNEAR. Bare numeric strings are
//! rejected as ambiguous. Gas accepts `"30 Tgas"` (case-insensitive) or a
//! bare integer of raw gas units.

use std::fmt::{self, Display};
use std::ops::{Add, Sub};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ParseAmountError, ParseGasError};

/// One NEAR in yoctoNEAR (10^24).
const YOCTO_PER_NEAR: u128 = 1_000_000_000_000_000_000_000_000;
/// One milliNEAR in yoctoNEAR (10^21).
const YOCTO_PER_MILLINEAR: u128 = 1_000_000_000_000_000_000_000;

/// A NEAR token amount with yoctoNEAR precision (10^-24 NEAR).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NearToken(u128);

impl NearToken {
    pub const ZERO: Self = Self(0);
    pub const ONE_YOCTO: Self = Self(1);
    pub const ONE_NEAR: Self = Self(YOCTO_PER_NEAR);

    /// Create from whole NEAR.
    pub const fn near(near: u128) -> Self {
        Self(near * YOCTO_PER_NEAR)
    }

    /// Create from milliNEAR (10^-3 NEAR).
    pub const fn millinear(millinear: u128) -> Self {
        Self(millinear * YOCTO_PER_MILLINEAR)
    }

    /// Create from yoctoNEAR.
    pub const fn yocto(yocto: u128) -> Self {
        Self(yocto)
    }

    /// Parse a decimal NEAR amount (e.g. `"1.5"`). The fractional part is
    /// padded or truncated to 24 decimal places.
    pub fn from_near_decimal(s: &str) -> Result<Self, ParseAmountError> {
        let s = s.trim();
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };

        let integer: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| ParseAmountError::InvalidNumber(s.to_string()))?
        };

        let frac = if frac_part.len() > 24 {
            &frac_part[..24]
        } else {
            frac_part
        };
        let frac_value: u128 = if frac.is_empty() {
            0
        } else {
            frac.parse()
                .map_err(|_| ParseAmountError::InvalidNumber(s.to_string()))?
        };
        let frac_yocto = frac_value * 10u128.pow((24 - frac.len()) as u32);

        integer
            .checked_mul(YOCTO_PER_NEAR)
            .and_then(|v| v.checked_add(frac_yocto))
            .map(Self)
            .ok_or(ParseAmountError::Overflow)
    }

    /// Raw yoctoNEAR value.
    pub const fn as_yoctonear(&self) -> u128 {
        self.0
    }

    /// Whole NEAR (truncated).
    pub const fn as_near(&self) -> u128 {
        self.0 / YOCTO_PER_NEAR
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl FromStr for NearToken {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(value) = s.strip_suffix(" NEAR").or_else(|| s.strip_suffix(" near")) {
            return Self::from_near_decimal(value);
        }

        if let Some(value) = s
            .strip_suffix(" milliNEAR")
            .or_else(|| s.strip_suffix(" mNEAR"))
        {
            let v: u128 = value
                .trim()
                .parse()
                .map_err(|_| ParseAmountError::InvalidNumber(s.to_string()))?;
            return v
                .checked_mul(YOCTO_PER_MILLINEAR)
                .map(Self)
                .ok_or(ParseAmountError::Overflow);
        }

        if let Some(value) = s
            .strip_suffix(" yoctoNEAR")
            .or_else(|| s.strip_suffix(" yocto"))
        {
            let v: u128 = value
                .trim()
                .parse()
                .map_err(|_| ParseAmountError::InvalidNumber(s.to_string()))?;
            return Ok(Self(v));
        }

        // A bare number has no unit and is rejected as ambiguous.
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(ParseAmountError::AmbiguousAmount(s.to_string()));
        }

        Err(ParseAmountError::InvalidFormat(s.to_string()))
    }
}

impl TryFrom<&str> for NearToken {
    type Error = ParseAmountError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for NearToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let near = self.0 / YOCTO_PER_NEAR;
        let remainder = self.0 % YOCTO_PER_NEAR;
        if remainder == 0 {
            write!(f, "{} NEAR", near)
        } else {
            let decimal = format!("{:024}", remainder);
            let decimal = decimal.trim_end_matches('0');
            let shown = decimal.len().min(5);
            write!(f, "{}.{} NEAR", near, &decimal[..shown])
        }
    }
}

impl Add for NearToken {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for NearToken {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

// RPC JSON carries big integers as base-10 strings.
impl Serialize for NearToken {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for NearToken {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(d)?;
        Ok(Self(s.parse().map_err(serde::de::Error::custom)?))
    }
}

impl BorshSerialize for NearToken {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&self.0, writer)
    }
}

impl BorshDeserialize for NearToken {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self(u128::deserialize_reader(reader)?))
    }
}

// ============================================================================
// Gas
// ============================================================================

/// Gas per teragas (10^12).
const GAS_PER_TGAS: u64 = 1_000_000_000_000;
/// Gas per gigagas (10^9).
const GAS_PER_GGAS: u64 = 1_000_000_000;

/// Gas units for transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Gas(u64);

impl Gas {
    pub const ZERO: Self = Self(0);
    pub const ONE_TGAS: Self = Self(GAS_PER_TGAS);

    /// Default gas for function calls (30 Tgas).
    pub const DEFAULT: Self = Self::tgas(30);

    /// Maximum gas attachable to a transaction (1000 Tgas).
    pub const MAX: Self = Self::tgas(1_000);

    /// Create from teragas (10^12).
    pub const fn tgas(tgas: u64) -> Self {
        Self(tgas * GAS_PER_TGAS)
    }

    /// Create from gigagas (10^9).
    pub const fn ggas(ggas: u64) -> Self {
        Self(ggas * GAS_PER_GGAS)
    }

    /// Create from raw gas units.
    pub const fn from_gas(gas: u64) -> Self {
        Self(gas)
    }

    /// Raw gas value.
    pub const fn as_gas(&self) -> u64 {
        self.0
    }

    /// Value in teragas (truncated).
    pub const fn as_tgas(&self) -> u64 {
        self.0 / GAS_PER_TGAS
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl FromStr for Gas {
    type Err = ParseGasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        // Unit suffixes are case-insensitive: "30 Tgas", "30 TGAS", "30 tgas".
        let lower = s.to_ascii_lowercase();
        for (suffix, multiplier) in [(" tgas", GAS_PER_TGAS), (" ggas", GAS_PER_GGAS), (" gas", 1)]
        {
            if let Some(value) = lower.strip_suffix(suffix) {
                let v: u64 = value
                    .trim()
                    .parse()
                    .map_err(|_| ParseGasError::InvalidNumber(s.to_string()))?;
                return v
                    .checked_mul(multiplier)
                    .map(Self)
                    .ok_or(ParseGasError::Overflow);
            }
        }

        // A bare integer is raw gas.
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            let v: u64 = s
                .parse()
                .map_err(|_| ParseGasError::InvalidNumber(s.to_string()))?;
            return Ok(Self(v));
        }

        Err(ParseGasError::InvalidFormat(s.to_string()))
    }
}

impl TryFrom<&str> for Gas {
    type Error = ParseGasError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 && self.0 % GAS_PER_TGAS == 0 {
            write!(f, "{} Tgas", self.0 / GAS_PER_TGAS)
        } else {
            write!(f, "{} gas", self.0)
        }
    }
}

// RPC JSON carries gas as a plain number.
impl Serialize for Gas {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Gas {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Self(<u64 as Deserialize>::deserialize(d)?))
    }
}

impl BorshSerialize for Gas {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&self.0, writer)
    }
}

impl BorshDeserialize for Gas {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self(u64::deserialize_reader(reader)?))
    }
}

// ============================================================================
// Conversion traits
// ============================================================================

/// Accepts typed [`NearToken`] values, unit-suffixed strings, or a `u128`
/// of yoctoNEAR.
pub trait IntoNearToken {
    fn into_near_token(self) -> Result<NearToken, ParseAmountError>;
}

impl IntoNearToken for NearToken {
    fn into_near_token(self) -> Result<NearToken, ParseAmountError> {
        Ok(self)
    }
}

impl IntoNearToken for u128 {
    fn into_near_token(self) -> Result<NearToken, ParseAmountError> {
        Ok(NearToken::yocto(self))
    }
}

impl IntoNearToken for &str {
    fn into_near_token(self) -> Result<NearToken, ParseAmountError> {
        self.parse()
    }
}

impl IntoNearToken for String {
    fn into_near_token(self) -> Result<NearToken, ParseAmountError> {
        self.parse()
    }
}

impl IntoNearToken for &String {
    fn into_near_token(self) -> Result<NearToken, ParseAmountError> {
        self.parse()
    }
}

/// Accepts typed [`Gas`] values, unit-suffixed strings, or a bare `u64`
/// of raw gas.
pub trait IntoGas {
    fn into_gas(self) -> Result<Gas, ParseGasError>;
}

impl IntoGas for Gas {
    fn into_gas(self) -> Result<Gas, ParseGasError> {
        Ok(self)
    }
}

impl IntoGas for u64 {
    fn into_gas(self) -> Result<Gas, ParseGasError> {
        Ok(Gas::from_gas(self))
    }
}

impl IntoGas for &str {
    fn into_gas(self) -> Result<Gas, ParseGasError> {
        self.parse()
    }
}

impl IntoGas for String {
    fn into_gas(self) -> Result<Gas, ParseGasError> {
        self.parse()
    }
}

impl IntoGas for &String {
    fn into_gas(self) -> Result<Gas, ParseGasError> {
        self.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_near_amounts() {
        assert_eq!(
            "5 NEAR".parse::<NearToken>().unwrap().as_yoctonear(),
            5 * YOCTO_PER_NEAR
        );
        assert_eq!(
            "1.5 NEAR".parse::<NearToken>().unwrap().as_yoctonear(),
            YOCTO_PER_NEAR + YOCTO_PER_NEAR / 2
        );
        assert_eq!("1000 yocto".parse::<NearToken>().unwrap().as_yoctonear(), 1000);
        assert_eq!("7 yoctoNEAR".parse::<NearToken>().unwrap().as_yoctonear(), 7);
        assert_eq!(
            "100 milliNEAR".parse::<NearToken>().unwrap().as_yoctonear(),
            100 * YOCTO_PER_MILLINEAR
        );
    }

    #[test]
    fn bare_number_is_ambiguous() {
        assert!(matches!(
            "123".parse::<NearToken>(),
            Err(ParseAmountError::AmbiguousAmount(_))
        ));
        assert!(matches!(
            "1.5".parse::<NearToken>(),
            Err(ParseAmountError::AmbiguousAmount(_))
        ));
    }

    #[test]
    fn fractional_part_padded_to_24_places() {
        // 0.1 NEAR = 10^23 yocto
        assert_eq!(
            "0.1 NEAR".parse::<NearToken>().unwrap().as_yoctonear(),
            100_000_000_000_000_000_000_000
        );
        // more than 24 places is truncated, not rounded
        let long = format!("0.{} NEAR", "9".repeat(30));
        assert_eq!(
            long.parse::<NearToken>().unwrap().as_yoctonear(),
            YOCTO_PER_NEAR - 1
        );
    }

    #[test]
    fn parse_invalid_amounts() {
        assert!(matches!(
            "5 ETH".parse::<NearToken>(),
            Err(ParseAmountError::InvalidFormat(_))
        ));
        assert!(matches!(
            "abc NEAR".parse::<NearToken>(),
            Err(ParseAmountError::InvalidNumber(_))
        ));
    }

    #[test]
    fn near_token_display() {
        assert_eq!(NearToken::ZERO.to_string(), "0 NEAR");
        assert_eq!(NearToken::near(5).to_string(), "5 NEAR");
        assert_eq!(
            NearToken::yocto(YOCTO_PER_NEAR + YOCTO_PER_NEAR / 2).to_string(),
            "1.5 NEAR"
        );
    }

    #[test]
    fn near_token_json_is_decimal_string() {
        let amount = NearToken::near(1);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"1000000000000000000000000\"");
        let parsed: NearToken = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, amount);
    }

    #[test]
    fn near_token_borsh_is_u128_le() {
        let amount = NearToken::yocto(258);
        let bytes = borsh::to_vec(&amount).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], 1);
        assert_eq!(borsh::from_slice::<NearToken>(&bytes).unwrap(), amount);
    }

    #[test]
    fn parse_gas_units() {
        assert_eq!("30 Tgas".parse::<Gas>().unwrap().as_gas(), 30 * GAS_PER_TGAS);
        assert_eq!("30 tgas".parse::<Gas>().unwrap().as_gas(), 30 * GAS_PER_TGAS);
        assert_eq!("30 TGAS".parse::<Gas>().unwrap().as_gas(), 30 * GAS_PER_TGAS);
        assert_eq!("5 Ggas".parse::<Gas>().unwrap().as_gas(), 5 * GAS_PER_GGAS);
        assert_eq!("1000 gas".parse::<Gas>().unwrap().as_gas(), 1000);
    }

    #[test]
    fn bare_integer_is_raw_gas() {
        assert_eq!("1000000".parse::<Gas>().unwrap().as_gas(), 1_000_000);
    }

    #[test]
    fn parse_invalid_gas() {
        assert!("30 teragas".parse::<Gas>().is_err());
        assert!("abc Tgas".parse::<Gas>().is_err());
        assert!("".parse::<Gas>().is_err());
    }

    #[test]
    fn gas_display() {
        assert_eq!(Gas::tgas(30).to_string(), "30 Tgas");
        assert_eq!(Gas::from_gas(1500).to_string(), "1500 gas");
    }

    #[test]
    fn gas_json_is_number() {
        let gas = Gas::tgas(30);
        let json = serde_json::to_value(gas).unwrap();
        assert!(json.is_u64());
        assert_eq!(serde_json::from_value::<Gas>(json).unwrap(), gas);
    }

    #[test]
    fn conversion_traits() {
        assert_eq!(
            1_000_000u128.into_near_token().unwrap(),
            NearToken::yocto(1_000_000)
        );
        assert_eq!("1 yocto".into_near_token().unwrap(), NearToken::ONE_YOCTO);
        assert_eq!("30 Tgas".into_gas().unwrap(), Gas::tgas(30));
        assert_eq!(5u64.into_gas().unwrap(), Gas::from_gas(5));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(NearToken::near(2) + NearToken::near(3), NearToken::near(5));
        assert_eq!(NearToken::near(5) - NearToken::near(3), NearToken::near(2));
        assert!(NearToken::yocto(u128::MAX)
            .checked_add(NearToken::ONE_YOCTO)
            .is_none());
        assert_eq!(
            NearToken::ZERO.saturating_sub(NearToken::ONE_NEAR),
            NearToken::ZERO
        );
        assert!(Gas::from_gas(u64::MAX).checked_add(Gas::from_gas(1)).is_none());
    }
}
