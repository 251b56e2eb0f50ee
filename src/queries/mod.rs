pub mod category_queries;
pub mod product_queries;
