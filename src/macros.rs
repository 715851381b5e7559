/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

#![macro_use]

macro_rules! gen_setter {
    ($(#[$comments:meta])* $field:ident : into $t:ty) => {
        $(#[$comments])*
        ///
        /// <small>See [`ParserConfig`][crate::ParserConfig] fields docs for details</small>
        #[inline]
        #[must_use]
        pub fn $field<T: Into<$t>>(mut self, value: T) -> Self {
            self.$field = value.into();
            self
        }
    };
    ($(#[$comments:meta])* $field:ident : val $t:ty) => {
        $(#[$comments])*
        ///
        /// <small>See [`ParserConfig`][crate::ParserConfig] fields docs for details</small>
        #[inline]
        #[must_use]
        pub fn $field(mut self, value: $t) -> Self {
            self.$field = value;
            self
        }
    };
}

macro_rules! gen_setters {
    ($target:ident, $($(#[$comments:meta])* $field:ident : $k:tt $tpe:ty),+) => (
        impl $target {$(
            gen_setter! { $(#[$comments])* $field : $k $tpe }
        )+
    })
}
