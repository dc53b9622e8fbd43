use std::fmt;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    #[error("CIDR must be in format ADDRESS/PREFIX")]
    Parts,
    #[error("address of the CIDR has wrong format")]
    Address(#[from] AddrParseError),
    #[error(r#"prefix of the CIDR has wrong format: "{0}""#)]
    PrefixFormat(String),
    #[error(r#"prefix of the CIDR is too large: "{0}""#)]
    PrefixTooLarge(u32),
}

pub trait IpFamily {
    type Addr: FromStr<Err = AddrParseError> + From<Self::UInt> + Copy + fmt::Display;
    type UInt: From<Self::Addr>
        + Copy
        + Eq
        + fmt::Debug
        + std::ops::BitAnd<Self::UInt, Output = Self::UInt>;
    const BITS: u32;

    fn mask_from_prefix(prefix: u32) -> Option<Self::UInt>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IpV4;

impl IpFamily for IpV4 {
    type Addr = Ipv4Addr;
    type UInt = u32;
    const BITS: u32 = u32::BITS;

    fn mask_from_prefix(prefix: u32) -> Option<Self::UInt> {
        let host_bits = Self::BITS.checked_sub(prefix)?;
        // shifting by the full width means /0
        Some(u32::MAX.checked_shl(host_bits).unwrap_or(0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IpV6;

impl IpFamily for IpV6 {
    type Addr = Ipv6Addr;
    type UInt = u128;
    const BITS: u32 = u128::BITS;

    fn mask_from_prefix(prefix: u32) -> Option<Self::UInt> {
        let host_bits = Self::BITS.checked_sub(prefix)?;
        Some(u128::MAX.checked_shl(host_bits).unwrap_or(0))
    }
}

/// Network of a single address family. Host bits given in the textual form are
/// masked off, so `192.0.2.77/24` is stored as `192.0.2.0/24`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cidr<Ip>
where
    Ip: IpFamily,
{
    network: Ip::UInt,
    mask: Ip::UInt,
    prefix: u8,
}

impl<Ip> Cidr<Ip>
where
    Ip: IpFamily,
{
    pub fn contains(&self, address: Ip::Addr) -> bool {
        let address: Ip::UInt = address.into();
        address & self.mask == self.network
    }

    pub fn network(&self) -> Ip::Addr {
        self.network.into()
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix
    }
}

impl<Ip> FromStr for Cidr<Ip>
where
    Ip: IpFamily,
{
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix) = s.split_once('/').ok_or(CidrError::Parts)?;
        let address: Ip::Addr = address.parse()?;
        // u32::from_str would also take a leading '+'
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CidrError::PrefixFormat(prefix.to_owned()));
        }
        let prefix: u32 = prefix
            .parse()
            .map_err(|_| CidrError::PrefixTooLarge(u32::MAX))?;
        let mask = Ip::mask_from_prefix(prefix).ok_or(CidrError::PrefixTooLarge(prefix))?;
        let address: Ip::UInt = address.into();
        Ok(Self {
            network: address & mask,
            mask,
            // bounded by BITS, which is at most 128
            prefix: prefix as u8,
        })
    }
}

impl<Ip> fmt::Display for Cidr<Ip>
where
    Ip: IpFamily,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    V4(Cidr<IpV4>),
    V6(Cidr<IpV6>),
}

impl Network {
    pub fn contains(&self, address: IpAddr) -> bool {
        match (self, address) {
            (Self::V4(cidr), IpAddr::V4(ip)) => cidr.contains(ip),
            (Self::V6(cidr), IpAddr::V6(ip)) => cidr.contains(ip),
            _ => false,
        }
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            Self::V4(cidr) => cidr.prefix_len(),
            Self::V6(cidr) => cidr.prefix_len(),
        }
    }

    pub fn is_ipv4(&self) -> bool {
        matches!(self, Self::V4(_))
    }
}

impl FromStr for Network {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, _) = s.split_once('/').ok_or(CidrError::Parts)?;
        if address.contains(':') {
            Ok(Self::V6(s.parse()?))
        } else {
            Ok(Self::V4(s.parse()?))
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(cidr) => fmt::Display::fmt(cidr, f),
            Self::V6(cidr) => fmt::Display::fmt(cidr, f),
        }
    }
}
