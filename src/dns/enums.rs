#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DNSOpcode {
    #[default]
    Query,
    IQuery,
    Status,
    Notify,
    Update,
    Unknown(u8),
}

impl From<u8> for DNSOpcode {
    fn from(value: u8) -> Self {
        match value {
            0 => DNSOpcode::Query,
            1 => DNSOpcode::IQuery,
            2 => DNSOpcode::Status,
            4 => DNSOpcode::Notify,
            5 => DNSOpcode::Update,
            x => DNSOpcode::Unknown(x),
        }
    }
}

impl From<DNSOpcode> for u8 {
    fn from(value: DNSOpcode) -> Self {
        match value {
            DNSOpcode::Query => 0,
            DNSOpcode::IQuery => 1,
            DNSOpcode::Status => 2,
            DNSOpcode::Notify => 4,
            DNSOpcode::Update => 5,
            DNSOpcode::Unknown(x) => x,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DNSRcode {
    #[default]
    NoError,
    FormErr,
    ServFail,
    NXDomain,
    NotImp,
    Refused,
    Unknown(u8),
}

impl From<u8> for DNSRcode {
    fn from(value: u8) -> Self {
        match value {
            0 => DNSRcode::NoError,
            1 => DNSRcode::FormErr,
            2 => DNSRcode::ServFail,
            3 => DNSRcode::NXDomain,
            4 => DNSRcode::NotImp,
            5 => DNSRcode::Refused,
            x => DNSRcode::Unknown(x),
        }
    }
}

impl From<DNSRcode> for u8 {
    fn from(value: DNSRcode) -> Self {
        match value {
            DNSRcode::NoError => 0,
            DNSRcode::FormErr => 1,
            DNSRcode::ServFail => 2,
            DNSRcode::NXDomain => 3,
            DNSRcode::NotImp => 4,
            DNSRcode::Refused => 5,
            DNSRcode::Unknown(x) => x,
        }
    }
}

/// Resource record types the translator cares about. Everything else rides
/// through unchanged, so a single catch-all variant is enough.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DNSResourceType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    Unknown(u16),
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceType::A,
            2 => DNSResourceType::NS,
            5 => DNSResourceType::CNAME,
            6 => DNSResourceType::SOA,
            12 => DNSResourceType::PTR,
            15 => DNSResourceType::MX,
            16 => DNSResourceType::TXT,
            28 => DNSResourceType::AAAA,
            x => DNSResourceType::Unknown(x),
        }
    }
}

impl From<DNSResourceType> for u16 {
    fn from(value: DNSResourceType) -> Self {
        match value {
            DNSResourceType::A => 1,
            DNSResourceType::NS => 2,
            DNSResourceType::CNAME => 5,
            DNSResourceType::SOA => 6,
            DNSResourceType::PTR => 12,
            DNSResourceType::MX => 15,
            DNSResourceType::TXT => 16,
            DNSResourceType::AAAA => 28,
            DNSResourceType::Unknown(x) => x,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DNSResourceClass {
    #[default]
    IN,
    CH,
    HS,
    Unknown(u16),
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            x => DNSResourceClass::Unknown(x),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(value: DNSResourceClass) -> Self {
        match value {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::Unknown(x) => x,
        }
    }
}
