pub const CHANNEL_TYPES: &[char] = ['#', '&', '+', '!'].as_slice();
pub const CHANNEL_MEMBERSHIP_PREFIXES: &[char] = ['~', '&', '@', '%', '+'].as_slice();
