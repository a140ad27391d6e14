/// Khatmah Compute
///
/// Closed-form calculations behind the calendar and compass endpoints:
/// - Qibla bearing (initial great-circle course towards the Kaaba)
/// - Hijri month resolution for a Gregorian date
///
/// Nothing here touches storage; callers load the data and pass it in.

pub mod hijri;
pub mod qibla;
