use blossom_common::Baht;

use crate::db_types::District;

/// Fee charged when an address cannot be classified. It is the highest tier, so an unrecognised address is never
/// delivered for free.
pub const UNKNOWN_DISTRICT_FEE: Baht = Baht::from_const(500);

/// Looks up the flat delivery fee for a district. Only `Mueang` has two tiers, selected by the `is_central` flag.
pub fn delivery_fee(district: District, is_central: bool) -> Baht {
    let fee = match district {
        District::Mueang if is_central => 200,
        District::Mueang => 300,
        District::Saraphi => 300,
        District::SanSai => 300,
        District::SanKamphaeng => 350,
        District::MaeRim => 350,
        District::DoiSaket => 400,
        District::HangDong => 400,
        District::SanPaTong => 450,
        District::Unknown => return UNKNOWN_DISTRICT_FEE,
    };
    Baht::from(fee)
}
