//! The fixed set of administrative regions a user account belongs to.

pub const REGIONS: [&str; 34] = [
    "北京", "天津", "上海", "重庆", "河北", "山西", "辽宁", "吉林", "黑龙江", "江苏", "浙江",
    "安徽", "福建", "江西", "山东", "河南", "湖北", "湖南", "广东", "广西", "海南", "四川",
    "贵州", "云南", "西藏", "陕西", "甘肃", "青海", "宁夏", "新疆", "内蒙古", "香港", "澳门",
    "台湾",
];

pub const DEFAULT_REGION: &str = REGIONS[0];

pub fn is_valid(region: &str) -> bool {
    REGIONS.contains(&region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_region_is_listed() {
        assert!(is_valid(DEFAULT_REGION));
    }

    #[test]
    fn unknown_region_rejected() {
        assert!(!is_valid("atlantis"));
        assert!(!is_valid(""));
    }
}
