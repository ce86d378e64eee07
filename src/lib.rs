// 书架后端库
//
// 本库提供个人图书馆管理的核心功能，包括：
// - 图书数据模型（含封面记录）
// - 封面解析与缓存流水线
// - 外部元数据集成
// - 本地记录存储接口

pub mod external;
pub mod models;
pub mod services;
pub mod store;
