pub use crate::checksum::{crc16, crc16_incremental, crc32, xor_sum};
pub use crate::crypto::{
    aes128_cbc_decrypt, aes128_cbc_encrypt, aes128_ecb_decrypt_block, aes128_ecb_encrypt_block,
    des_family_cbc_decrypt, des_family_cbc_encrypt, des_family_ecb_decrypt_block,
    des_family_ecb_encrypt_block, increment_slice_mut, left_shift_1, random_bytes,
    rotate_left_bytes_1, xor_slice_mut, xor_slices, SessionCipher,
};
pub use crate::definitions::*;
pub use crate::log::{
    LogPayload, LogPayloadDict, LogPayloadDictValue, LogPayloadList, LogPayloadText, ToLogPayload,
};
pub use crate::pdu::{Request, Response};
pub use crate::status::{is_control_status, DesfireStatus};
pub use crate::wrapping_counter::WrappingCounter;
