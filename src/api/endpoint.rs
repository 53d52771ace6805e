pub type Endpoint = str;

pub const REALTIME_INFO: &Endpoint = "/proxy/api/getRealtimeInfo.do";
