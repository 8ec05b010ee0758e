pub(crate) mod builders;

use crate::zone::Endianness;
