use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guid: String,
    #[sea_orm(unique)]
    pub id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::principal::Entity",
        from = "Column::Guid",
        to = "super::principal::Column::Guid",
        on_delete = "Cascade"
    )]
    Principal,
    #[sea_orm(has_many = "super::group_assignment::Entity")]
    GroupAssignment,
}

impl Related<super::principal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Principal.def()
    }
}

impl Related<super::group_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupAssignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
