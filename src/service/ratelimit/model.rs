#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub used_today: u32,
    pub daily_limit: u32,
    pub remaining_today: u32,
    pub reset_time: String, // until midnight UTC
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { remaining: u32 },
    Exhausted { limit: u32 },
}
