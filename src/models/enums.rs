use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(ApplicationStatus {
    Scheduled => "scheduled",
    Waiting => "waiting",
    InAttendance => "in_attendance",
    Completed => "completed",
    Unscheduled => "unscheduled",
});

str_enum!(TreatmentStatus {
    Active => "active",
    Inactive => "inactive",
});

str_enum!(LedgerEntryType {
    Charge => "charge",
    Payment => "payment",
});

str_enum!(PaymentMethod {
    Pix => "pix",
    Credit => "credit",
    Debit => "debit",
    Cash => "cash",
});

str_enum!(ApplicationKind {
    Package => "package",
    Adhoc => "adhoc",
});

impl ApplicationStatus {
    /// Operator-facing label shown on the queue card badge.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scheduled => "Agendado",
            Self::Waiting => "Aguardando",
            Self::InAttendance => "Em Atendimento",
            Self::Completed => "Finalizado",
            Self::Unscheduled => "Não agendado",
        }
    }

    /// Statuses the queue screen shows before the operator touches a filter.
    pub fn default_filters() -> [ApplicationStatus; 3] {
        [Self::Scheduled, Self::Waiting, Self::InAttendance]
    }
}

impl TreatmentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Ativo",
            Self::Inactive => "Inativo",
        }
    }
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pix => "Pix",
            Self::Credit => "Crédito",
            Self::Debit => "Débito",
            Self::Cash => "Dinheiro",
        }
    }

    /// Only credit card payments may be split into installments.
    pub fn allows_installments(&self) -> bool {
        matches!(self, Self::Credit)
    }
}
